use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration, read from the environment with sensible
/// defaults so a bare `schoold` starts against a local workspace.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub workspace: PathBuf,
    pub secret: String,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new("127.0.0.1".parse().expect("literal addr"), 5001),
            workspace: PathBuf::from("./schoold-data"),
            secret: "schoold-dev-secret".to_string(),
            admin_name: "Administrator".to_string(),
            admin_email: "admin@schoold.local".to_string(),
            admin_password: "changeme".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut c = Self::default();

        if let Ok(s) = std::env::var("SCHOOLD_ADDR") {
            if let Ok(addr) = s.parse() {
                c.addr = addr;
            }
        }
        if let Ok(s) = std::env::var("SCHOOLD_WORKSPACE") {
            c.workspace = PathBuf::from(s);
        }
        if let Ok(s) = std::env::var("SCHOOLD_SECRET") {
            c.secret = s;
        }
        if let Ok(s) = std::env::var("SCHOOLD_ADMIN_NAME") {
            c.admin_name = s;
        }
        if let Ok(s) = std::env::var("SCHOOLD_ADMIN_EMAIL") {
            c.admin_email = s;
        }
        if let Ok(s) = std::env::var("SCHOOLD_ADMIN_PASSWORD") {
            c.admin_password = s;
        }

        c
    }
}
