use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Best-effort resolution of the machine's outbound-facing local address,
/// for display in startup logs. Connecting a UDP socket selects a route
/// without sending any packets. Falls back to loopback.
pub fn local_ip() -> IpAddr {
    resolve().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn resolve() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ip_never_panics() {
        // Either a routable address or the loopback fallback.
        let ip = local_ip();
        assert!(ip.is_ipv4() || ip.is_ipv6());
    }
}
