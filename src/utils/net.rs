use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Address of the interface used for outbound traffic, which is what other
/// machines on the LAN would connect to. Falls back to loopback.
///
/// Connecting a UDP socket sends nothing; it only asks the OS for a route.
pub fn local_ip() -> IpAddr {
    probe_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn probe_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_is_ipv4() {
        // Either a routed interface or the loopback fallback.
        assert!(local_ip().is_ipv4());
    }
}
