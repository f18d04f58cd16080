use serde::Serialize;
use std::fmt;

pub const OPC_TCP_SCHEME: &str = "opc.tcp";
pub const DEFAULT_PORT: u16 = 4840;

/// Parsed form of an endpoint URL such as `opc.tcp://0.0.0.0:4840/freeopcua/server/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Always starts with `/`.
    pub path: String,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, String> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| format!("Invalid endpoint URL '{}': missing scheme", url))?;
        if scheme != OPC_TCP_SCHEME {
            return Err(format!(
                "Invalid endpoint URL '{}': unsupported scheme '{}'",
                url, scheme
            ));
        }

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        // A bracketed IPv6 host carries its own colons, the port follows `]`.
        let (host, port) = match authority.strip_prefix('[') {
            Some(bracketed) => {
                let (host, after) = bracketed.split_once(']').ok_or_else(|| {
                    format!("Invalid endpoint URL '{}': unterminated IPv6 host", url)
                })?;
                if host.is_empty() {
                    return Err(format!("Invalid endpoint URL '{}': missing host", url));
                }
                let port = match after {
                    "" => None,
                    other => Some(other.strip_prefix(':').ok_or_else(|| {
                        format!("Invalid endpoint URL '{}': bad port '{}'", url, other)
                    })?),
                };
                (&authority[..host.len() + 2], port)
            }
            None => match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            },
        };
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| format!("Invalid endpoint URL '{}': bad port '{}'", url, port))?,
            None => DEFAULT_PORT,
        };
        if host.is_empty() {
            return Err(format!("Invalid endpoint URL '{}': missing host", url));
        }

        Ok(Endpoint {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// URL a client on this machine would use to reach the endpoint.
    /// Wildcard listen addresses are replaced by loopback.
    pub fn client_url(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
            other => other,
        };
        format!("{}://{}:{}{}", OPC_TCP_SCHEME, host, self.port, self.path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", OPC_TCP_SCHEME, self.host, self.port, self.path)
    }
}
