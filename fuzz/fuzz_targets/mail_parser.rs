#![no_main]
use libfuzzer_sys::fuzz_target;
use mailrelay_mail_parser::{Mail, RecipientsOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(data) = std::str::from_utf8(data) else {
        return;
    };

    let mut mail = Mail::new(data);
    if let Ok(sections) = mail.sections() {
        assert_eq!(
            format!("{}{}{}{}", sections.header, sections.eol, sections.sep, sections.body),
            data
        );
    }
    let _ = mail.message_id();
    let _ = mail.date();
    let _ = mail.recipients(&RecipientsOptions::with_domain("example.com"));
    let _ = mail.simple_find_all_addresses();
    let _ = mail.append_headers(&[("X-Fuzz", "1")]);
});
