//! JID helpers: group detection and phone-digit extraction.

/// Server suffix of group chat JIDs.
pub const GROUP_SUFFIX: &str = "@g.us";

/// True if the chat id refers to a group chat.
pub fn is_group(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

/// Every ASCII digit of `jid`, in order (e.g. `6281234567890@s.whatsapp.net` -> `6281234567890`).
pub fn phone_digits(jid: &str) -> String {
    jid.chars().filter(|c| c.is_ascii_digit()).collect()
}
