/// Host header -> canonical tenant lookup key
///
/// Drops the port and any configured leading prefixes (`www.` and `dev.` by
/// default). Prefixes are matched case-sensitively and stripped repeatedly, so
/// resolving an already canonical hostname returns it unchanged.
#[derive(Debug, Clone)]
pub struct HostnameResolver {
    prefixes: Vec<String>,
}

impl Default for HostnameResolver {
    fn default() -> Self {
        Self::new(["www.", "dev."])
    }
}

impl HostnameResolver {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        // longest first, so "dev.www." wins over "dev."
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn resolve(&self, host_header: &str) -> String {
        let mut hostname = strip_port(host_header);

        while let Some(prefix) = self
            .prefixes
            .iter()
            .find(|p| hostname.len() > p.len() && hostname.starts_with(p.as_str()))
        {
            hostname = &hostname[prefix.len()..];
        }

        hostname.to_string()
    }
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6 literal, e.g. [::1]:8080
    if host.starts_with('[') {
        if let Some(end) = host.find(']') {
            let rest = &host[end + 1..];
            if rest.is_empty() || rest.starts_with(':') {
                return &host[..=end];
            }
        }
    }
    host.split(':').next().unwrap_or(host)
}
