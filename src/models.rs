pub mod domain {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::net::Ipv4Addr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Protocol {
        Tcp,
        Udp,
        Icmp,
    }

    impl Protocol {
        pub const ALL: [Protocol; 3] = [Protocol::Tcp, Protocol::Udp, Protocol::Icmp];

        pub fn as_str(&self) -> &'static str {
            match self {
                Protocol::Tcp => "TCP",
                Protocol::Udp => "UDP",
                Protocol::Icmp => "ICMP",
            }
        }
    }

    impl fmt::Display for Protocol {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// One synthetic packet. Field names match the `recent_packets` entries
    /// of the wire frame.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PacketEvent {
        #[serde(rename = "src_ip")]
        pub source: Ipv4Addr,
        #[serde(rename = "dst_ip")]
        pub destination: Ipv4Addr,
        pub protocol: Protocol,
        pub size: u32,
        /// Epoch milliseconds.
        pub timestamp: i64,
    }
}

pub mod dto {
    use super::domain::{PacketEvent, Protocol};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    /// Value copy of the aggregate state at one tick. This is also the frame
    /// pushed to every viewer, one per connection per tick.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Snapshot {
        #[serde(rename = "packet_count")]
        pub total_count: u64,
        pub protocol_counts: HashMap<Protocol, u64>,
        #[serde(rename = "sps_data")]
        pub destination_counts: HashMap<String, u64>,
        #[serde(rename = "recent_packets")]
        pub recent_events: Vec<PacketEvent>,
    }

    impl Snapshot {
        pub fn to_json(&self) -> Result<String, serde_json::Error> {
            serde_json::to_string(self)
        }

        pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
            serde_json::from_str(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::domain::{PacketEvent, Protocol};
    use super::dto::Snapshot;
    use std::net::Ipv4Addr;

    #[test]
    fn frame_uses_wire_field_names() {
        let event = PacketEvent {
            source: Ipv4Addr::new(192, 168, 0, 1),
            destination: Ipv4Addr::new(10, 0, 0, 1),
            protocol: Protocol::Icmp,
            size: 64,
            timestamp: 1_700_000_000_000,
        };
        let mut snapshot = Snapshot {
            total_count: 1,
            recent_events: vec![event],
            ..Default::default()
        };
        snapshot.protocol_counts.insert(Protocol::Icmp, 1);
        snapshot.destination_counts.insert("10.0.0.1".into(), 1);

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["packet_count"], 1);
        assert_eq!(value["protocol_counts"]["ICMP"], 1);
        assert_eq!(value["sps_data"]["10.0.0.1"], 1);
        let packet = &value["recent_packets"][0];
        assert_eq!(packet["src_ip"], "192.168.0.1");
        assert_eq!(packet["dst_ip"], "10.0.0.1");
        assert_eq!(packet["protocol"], "ICMP");
        assert_eq!(packet["size"], 64);
        assert_eq!(packet["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn parses_frame_from_other_producers() {
        let text = r#"{
            "packet_count": 2,
            "protocol_counts": {"TCP": 1, "UDP": 1},
            "sps_data": {"1.2.3.4": 2},
            "recent_packets": [
                {"src_ip": "5.6.7.8", "dst_ip": "1.2.3.4", "protocol": "UDP", "size": 900, "timestamp": 12}
            ]
        }"#;
        let snapshot = Snapshot::from_json(text).unwrap();
        assert_eq!(snapshot.total_count, 2);
        assert_eq!(snapshot.protocol_counts[&Protocol::Udp], 1);
        assert_eq!(snapshot.recent_events[0].protocol, Protocol::Udp);
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        let text = r#"{"packet_count":0,"protocol_counts":{"SCTP":1},"sps_data":{},"recent_packets":[]}"#;
        assert!(Snapshot::from_json(text).is_err());
    }
}
