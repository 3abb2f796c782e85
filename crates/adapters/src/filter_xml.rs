// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the libvirt network-filter XML that restricts a VM's outbound
//! traffic to an allow-listed set of hosts (§4.4.2 "Build network filter").

/// Build a name-filter XML permitting only the given IPs, plus ARP/DHCP to
/// the bridge and broadcast traffic. `allowed_ips` should already contain
/// the host's bridge IP and the code-cache host alongside any
/// job-whitelisted hosts.
pub fn build_filter_xml(filter_name: &str, allowed_ips: &[String]) -> String {
    let mut rules = String::new();
    for ip in allowed_ips {
        rules.push_str(&format!(
            "  <rule action='accept' direction='out' priority='500'>\n    <ip dstipaddr='{}'/>\n  </rule>\n",
            xml_escape(ip)
        ));
    }
    rules.push_str(
        "  <rule action='accept' direction='out' priority='500'>\n    <arp/>\n  </rule>\n",
    );
    rules.push_str(
        "  <rule action='accept' direction='inout' priority='500'>\n    <udp dstportstart='67' dstportend='68'/>\n  </rule>\n",
    );
    rules.push_str("  <rule action='drop' direction='out' priority='1000'/>\n");

    format!(
        "<filter name='{name}' chain='root'>\n{rules}</filter>\n",
        name = xml_escape(filter_name),
        rules = rules
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_xml_permits_every_allowed_ip_and_drops_the_rest() {
        let xml = build_filter_xml(
            "talus-whitelist-job-1",
            &["10.0.0.1".to_string(), "198.51.100.20".to_string()],
        );
        assert!(xml.contains("dstipaddr='10.0.0.1'"));
        assert!(xml.contains("dstipaddr='198.51.100.20'"));
        assert!(xml.contains("action='drop'"));
    }

    #[test]
    fn filter_xml_with_no_hosts_still_allows_arp_and_dhcp() {
        let xml = build_filter_xml("talus-whitelist-empty", &[]);
        assert!(xml.contains("<arp/>"));
        assert!(xml.contains("dstportstart='67'"));
    }
}
