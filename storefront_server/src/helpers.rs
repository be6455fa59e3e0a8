use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::trace;
use regex::Regex;

use crate::config::ServerOptions;

/// The remote IP address of the request. In decreasing order of preference:
/// 1. The first address in the `X-Forwarded-For` header, if `use_x_forwarded_for` is set.
/// 2. The `for=` address in the `Forwarded` header, if `use_forwarded` is set.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, options: ServerOptions) -> Option<IpAddr> {
    let mut result = None;
    if options.use_x_forwarded_for {
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        trace!("X-Forwarded-For remote address: {result:?}");
    }
    if options.use_forwarded && result.is_none() {
        let re = Regex::new(r#"for="?(?P<ip>[^;,"]+)"#).ok()?;
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| re.captures(v))
            .and_then(|caps| caps.name("ip"))
            .and_then(|m| IpAddr::from_str(m.as_str()).ok());
        trace!("Forwarded remote address: {result:?}");
    }
    result.or_else(|| req.peer_addr().map(|a| a.ip()))
}
