use reqwest::cookie::Jar;
use reqwest::Url;
use std::path::Path;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One entry of a Netscape `cookies.txt` export
#[derive(Debug, Clone, PartialEq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub expires: Option<u64>,
    pub name: String,
    pub value: String,
    pub http_only: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum CookieFileError {
    #[error("could not read cookie file: {0}")]
    Io(#[from] std::io::Error),

    #[error("file does not look like a Netscape format cookies file")]
    MissingHeader,

    #[error("malformed cookie on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl NetscapeCookie {
    /// `Set-Cookie` header value understood by the reqwest cookie jar
    pub fn set_cookie_header(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            header.push_str(&format!("; Domain={}", self.domain));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }

    /// URL the cookie is registered against
    pub fn origin_url(&self) -> Option<Url> {
        let host = self.domain.trim_start_matches('.');
        Url::parse(&format!("https://{}{}", host, self.path)).ok()
    }
}

fn parse_flag(value: &str, line: usize) -> Result<bool, CookieFileError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        other => Err(CookieFileError::Malformed {
            line,
            reason: format!("expected TRUE or FALSE, found '{}'", other),
        }),
    }
}

/// Parse the contents of a Netscape cookie jar.
///
/// The first line must carry the `# Netscape HTTP Cookie File` (or
/// `# HTTP Cookie File`) magic. Expiry times are kept but not enforced.
pub fn parse_netscape(content: &str) -> Result<Vec<NetscapeCookie>, CookieFileError> {
    let mut lines = content.lines().enumerate();

    let header = lines.next().map(|(_, l)| l).unwrap_or_default();
    if !(header.contains("# Netscape HTTP Cookie File") || header.contains("# HTTP Cookie File")) {
        return Err(CookieFileError::MissingHeader);
    }

    let mut cookies = Vec::new();
    for (index, raw) in lines {
        let line_no = index + 1;
        let line = raw.trim_end_matches(['\r', '\n']);

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return Err(CookieFileError::Malformed {
                line: line_no,
                reason: format!("expected 7 tab-separated fields, found {}", fields.len()),
            });
        }

        let expires = match fields[4] {
            "" | "0" => None,
            raw => Some(raw.parse::<u64>().map_err(|_| CookieFileError::Malformed {
                line: line_no,
                reason: format!("invalid expiry '{}'", raw),
            })?),
        };

        cookies.push(NetscapeCookie {
            domain: fields[0].to_string(),
            include_subdomains: parse_flag(fields[1], line_no)?,
            path: fields[2].to_string(),
            secure: parse_flag(fields[3], line_no)?,
            expires,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
            http_only,
        });
    }

    Ok(cookies)
}

/// Load a cookie file into the jar, returning how many cookies were added
pub fn load_into_jar(path: &Path, jar: &Jar) -> Result<usize, CookieFileError> {
    let content = fs_err::read_to_string(path)?;
    let cookies = parse_netscape(&content)?;

    let mut loaded = 0;
    for cookie in &cookies {
        match cookie.origin_url() {
            Some(url) => {
                jar.add_cookie_str(&cookie.set_cookie_header(), &url);
                loaded += 1;
            }
            None => tracing::debug!("Skipping cookie {} for unusable domain {}", cookie.name, cookie.domain),
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
# This is a generated file! Do not edit.\n\
\n\
.youtube.com\tTRUE\t/\tTRUE\t1767225600\tPREF\tf6=40000000&hl=en\n\
#HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t0\tLOGIN_INFO\tabc123\n\
www.youtube.com\tFALSE\t/watch\tFALSE\t0\tVISITOR\txyz\n";

    #[test]
    fn test_parse_sample_jar() {
        let cookies = parse_netscape(SAMPLE).unwrap();
        assert_eq!(cookies.len(), 3);

        assert_eq!(cookies[0].name, "PREF");
        assert_eq!(cookies[0].value, "f6=40000000&hl=en");
        assert_eq!(cookies[0].expires, Some(1767225600));
        assert!(cookies[0].secure);
        assert!(!cookies[0].http_only);

        assert_eq!(cookies[1].name, "LOGIN_INFO");
        assert!(cookies[1].http_only);
        assert_eq!(cookies[1].expires, None);

        assert!(!cookies[2].include_subdomains);
        assert_eq!(cookies[2].path, "/watch");
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let err = parse_netscape(".youtube.com\tTRUE\t/\tTRUE\t0\tA\tB\n").unwrap_err();
        assert!(matches!(err, CookieFileError::MissingHeader));
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        let err = parse_netscape("# HTTP Cookie File\n.youtube.com\tTRUE\t/\n").unwrap_err();
        assert!(matches!(err, CookieFileError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_bad_flag_is_rejected() {
        let err = parse_netscape("# HTTP Cookie File\n.youtube.com\tyes\t/\tTRUE\t0\tA\tB\n").unwrap_err();
        assert!(matches!(err, CookieFileError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_set_cookie_header() {
        let cookies = parse_netscape(SAMPLE).unwrap();
        assert_eq!(
            cookies[1].set_cookie_header(),
            "LOGIN_INFO=abc123; Path=/; Domain=.youtube.com; Secure; HttpOnly"
        );
        assert_eq!(
            cookies[2].origin_url().unwrap().as_str(),
            "https://www.youtube.com/watch"
        );
    }

    #[test]
    fn test_load_into_jar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, SAMPLE).unwrap();

        let jar = Jar::default();
        assert_eq!(load_into_jar(&path, &jar).unwrap(), 3);
    }
}
