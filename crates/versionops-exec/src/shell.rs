//! POSIX shell quoting

/// Quote a single word for `sh -c`
#[must_use]
pub fn quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', "'\"'\"'"))
}

/// Quote and join a program with its arguments
#[must_use]
pub fn quote_all<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| quote(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain_word() {
        assert_eq!(quote("/usr/sbin/nginx"), "/usr/sbin/nginx");
        assert_eq!(quote("--version"), "--version");
    }

    #[test]
    fn test_quote_special_chars() {
        assert_eq!(quote("my app"), "'my app'");
        assert_eq!(quote("it's"), "'it'\"'\"'s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_quote_all() {
        assert_eq!(quote_all(&["/opt/my app/bin", "-v"]), "'/opt/my app/bin' -v");
    }
}
