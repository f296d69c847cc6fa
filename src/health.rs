use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Check if a local port is accepting connections (forward is healthy).
pub fn check_port(port: u16) -> bool {
    TcpStream::connect_timeout(&loopback(port), Duration::from_secs(2)).is_ok()
}

/// Check if a local port is free (not already bound by another process).
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind(loopback(port)).is_ok()
}

/// Probe a list of local ports with retries over a timeout period.
/// Returns true if all ports became reachable within the timeout.
pub fn wait_healthy_ports(ports: &[u16], timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if ports.iter().all(|&p| check_port(p)) {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(500));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_port_is_healthy_and_taken() {
        let listener = TcpListener::bind(loopback(0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(check_port(port));
        assert!(!is_port_free(port));
        assert!(wait_healthy_ports(&[port], Duration::from_millis(100)));
    }

    #[test]
    fn released_port_is_free() {
        let port = {
            let listener = TcpListener::bind(loopback(0)).unwrap();
            listener.local_addr().unwrap().port()
        };

        assert!(is_port_free(port));
        assert!(!wait_healthy_ports(&[port], Duration::ZERO));
    }

    #[test]
    fn no_ports_is_trivially_healthy() {
        assert!(wait_healthy_ports(&[], Duration::ZERO));
    }
}
