/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::{hook::Hook, transport::Transport, DeliveryError};
use mailrelay_common::{DeliverContext, DeliverResult};
use mailrelay_mail_parser::Mail;

/// Runs the pre-hooks, the transport and the post-hooks of a delivery.
pub struct Deliverer {
    name: String,
    transport: Box<dyn Transport>,
    pre_hooks: Vec<Box<dyn Hook>>,
    post_hooks: Vec<Box<dyn Hook>>,
    /// Present when only one delivery at a time may run.
    serial: Option<tokio::sync::Mutex<()>>,
    counter: std::sync::atomic::AtomicU64,
}

impl std::fmt::Debug for Deliverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deliverer")
            .field("name", &self.name)
            .field(
                "pre_hooks",
                &self.pre_hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field(
                "post_hooks",
                &self.post_hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field("serialized", &self.serial.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder of [`Deliverer`].
pub struct DelivererBuilder {
    name: String,
    transport: Box<dyn Transport>,
    pre_hooks: Vec<Box<dyn Hook>>,
    post_hooks: Vec<Box<dyn Hook>>,
    serialized: bool,
}

impl DelivererBuilder {
    /// Run `hook` before the transport, after the hooks already registered.
    #[must_use]
    pub fn pre_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_hooks.push(Box::new(hook));
        self
    }

    /// Run `hook` after the transport, after the hooks already registered.
    #[must_use]
    pub fn post_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.post_hooks.push(Box::new(hook));
        self
    }

    /// Deliveries wait for the previous one to finish, in call order.
    #[must_use]
    pub const fn serialized(mut self, serialized: bool) -> Self {
        self.serialized = serialized;
        self
    }

    ///
    #[must_use]
    pub fn build(self) -> Deliverer {
        Deliverer {
            name: self.name,
            transport: self.transport,
            pre_hooks: self.pre_hooks,
            post_hooks: self.post_hooks,
            serial: self.serialized.then(|| tokio::sync::Mutex::new(())),
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

impl Deliverer {
    /// Start building a deliverer named `name` using `transport`.
    #[must_use]
    pub fn builder(name: impl Into<String>, transport: impl Transport + 'static) -> DelivererBuilder {
        DelivererBuilder {
            name: name.into(),
            transport: Box::new(transport),
            pre_hooks: vec![],
            post_hooks: vec![],
            serialized: false,
        }
    }

    ///
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver `raw`, recipients are left to the hooks.
    ///
    /// # Errors
    ///
    /// * see [`Deliverer::deliver`]
    pub async fn deliver_raw(&self, raw: impl Into<String> + Send) -> Result<DeliverResult, DeliveryError> {
        self.deliver(Mail::new(raw), None).await
    }

    /// Deliver `mail` to `recipients`, or to the recipients the hooks resolve.
    ///
    /// # Errors
    ///
    /// * [`DeliveryError::Parse`] if the header block of the mail is invalid
    /// * [`DeliveryError::Hook`] if a hook failed
    /// * [`DeliveryError::NoOutcome`] if the transport recorded nothing
    /// * [`DeliveryError::Failed`] if an outcome is not a success
    #[tracing::instrument(
        name = "deliver",
        skip_all,
        fields(deliverer = %self.name, id = tracing::field::Empty)
    )]
    pub async fn deliver(
        &self,
        mail: Mail,
        recipients: Option<Vec<String>>,
    ) -> Result<DeliverResult, DeliveryError> {
        let id = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        tracing::Span::current().record("id", id);

        if let Err(error) = mail.headers() {
            tracing::warn!(%error, "Invalid mail, nothing is run.");
            return Err(error.into());
        }

        let _guard = match &self.serial {
            Some(serial) => {
                tracing::debug!("Serialized deliverer, waiting for the previous delivery.");
                Some(serial.lock().await)
            }
            None => None,
        };

        tracing::info!("Begin to deliver mail.");
        let mut ctx = DeliverContext::new(mail, recipients);

        for hook in &self.pre_hooks {
            run_hook(hook.as_ref(), &mut ctx).await?;
        }

        self.transport.deliver(&mut ctx).await;

        for hook in &self.post_hooks {
            run_hook(hook.as_ref(), &mut ctx).await?;
        }

        let DeliverContext { result, .. } = ctx;
        tracing::info!("Delivery result:\n{}", result.summary());

        if result.recipients.is_empty() {
            tracing::warn!("Transport recorded no outcome.");
            Err(DeliveryError::NoOutcome {
                result: Box::new(result),
            })
        } else if result.has_failure() {
            tracing::warn!("Mail failed to deliver.");
            Err(DeliveryError::Failed {
                result: Box::new(result),
            })
        } else {
            tracing::info!("Mail delivered.");
            Ok(result)
        }
    }
}

async fn run_hook(hook: &dyn Hook, ctx: &mut DeliverContext) -> Result<(), DeliveryError> {
    tracing::debug!(hook = hook.name(), "Running hook.");

    hook.call(ctx).await.map_err(|source| {
        tracing::warn!(hook = hook.name(), error = %format!("{source:#}"), "Hook failed.");
        DeliveryError::Hook {
            name: hook.name(),
            source,
        }
    })
}
