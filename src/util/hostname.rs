//! Local hostname resolution.

use std::io;
use sysinfo::System;

/// Resolve the local hostname as the operating system reports it.
pub fn resolve_hostname() -> io::Result<String> {
    System::host_name()
        .as_deref()
        .and_then(clean)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "operating system reported no hostname"))
}

fn clean(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean("web-01\n"), Some("web-01".to_string()));
        assert_eq!(clean("  \n"), None);
    }

    #[test]
    fn test_resolve_hostname_ignores_environment() {
        let hostname = resolve_hostname().unwrap();
        assert!(!hostname.is_empty());
        assert_eq!(hostname, hostname.trim());

        // the OS name is used even when the shell exports nothing
        assert_eq!(System::host_name().as_deref().map(str::trim), Some(hostname.as_str()));
    }
}
