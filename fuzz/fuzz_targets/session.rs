#![no_main]
use libfuzzer_sys::fuzz_target;
use mailrelay_protocol::{MessageHandler, Session, SessionConfig};

struct Accept;

#[async_trait::async_trait]
impl MessageHandler for Accept {
    async fn on_message(&self, raw: String) -> anyhow::Result<String> {
        Ok(format!("{} bytes", raw.len()))
    }
}

fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    let data = data.to_vec();
    runtime.block_on(async move {
        let (server, client) = tokio::io::duplex(1024);
        let (read, write) = tokio::io::split(server);

        let session = Session::new(
            read,
            write,
            SessionConfig {
                server_name: "127.0.0.1:25".parse::<std::net::SocketAddr>().unwrap().into(),
                command_timeout: std::time::Duration::from_millis(10),
                data_timeout: std::time::Duration::from_millis(10),
                message_size_limit: 4096,
            },
        );

        let (mut client_read, mut client_write) = tokio::io::split(client);
        let send = async move {
            let _ = tokio::io::AsyncWriteExt::write_all(&mut client_write, &data).await;
        };
        let receive = async move {
            let mut sink = vec![];
            let _ = tokio::io::AsyncReadExt::read_to_end(&mut client_read, &mut sink).await;
        };

        let _ = tokio::join!(session.run(&Accept), send, receive);
    });
});
