//! Ring Builder Listing Parser
//!
//! Parses the text printed by `swift-ring-builder <file>`: the summary line
//! (partitions, replicas, balance), the minimum part hours line and the
//! device table. Both table layouts are understood:
//!
//! ```text
//! Devices:   id region zone ip address:port replication ip:port  name weight partitions balance flags meta
//!             0      1    1 10.0.0.1:6000    10.0.0.1:6000        disk0  20.00       1024    0.00       m1:disk0:/dev/sdb
//!
//! Devices:    id  region  zone      ip address  port  replication ip  replication port      name weight partitions balance meta
//!              0       1     1        10.0.0.1  6000        10.0.0.1              6000     disk0  20.00       1024    0.00 m1:disk0:/dev/sdb
//! ```

use crate::error::{Error, Result};
use crate::model::{Device, GroupType, Presence, RingSpec, DEFAULT_MIN_PART_HOURS};

/// Ring summary and devices of one builder file
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderListing {
    pub ring: RingSpec,
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `ip address:port` columns
    Combined {
        /// Width between the end of `balance` and the start of `meta` when
        /// a `flags` column sits between them
        flags_gap: Option<usize>,
    },
    /// `ip address  port` columns
    Separate,
}

impl Layout {
    fn from_header(header: &str) -> Self {
        if !header.contains("ip address:port") {
            return Layout::Separate;
        }
        let flags_gap = if header.split_whitespace().any(|t| t == "flags") {
            match (header.rfind("balance"), header.rfind("meta")) {
                (Some(balance), Some(meta)) if meta > balance + "balance".len() => {
                    Some(meta - balance - "balance".len())
                }
                _ => None,
            }
        } else {
            None
        };
        Layout::Combined { flags_gap }
    }

    /// Index of the `balance` token in a device row
    fn balance_column(self) -> usize {
        match self {
            Layout::Combined { .. } => 8,
            Layout::Separate => 10,
        }
    }
}

/// Whitespace separated tokens with their byte offsets
fn token_spans(line: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, &line[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, &line[s..]));
    }
    spans
}

/// Parse a listing for `ring_name` in deployment region `region_name`
pub fn parse_listing(builder: &str, region_name: &str, ring_name: &str, text: &str) -> Result<BuilderListing> {
    let fail = |reason: String| Error::RingBuilderParse {
        builder: builder.to_string(),
        reason,
    };

    let summary = text
        .lines()
        .find(|l| l.contains(" partitions, ") && l.contains(" replicas"))
        .ok_or_else(|| fail("no partition summary line".into()))?;
    let (partitions, replicas, balance) = parse_summary(summary).map_err(&fail)?;

    if !partitions.is_power_of_two() {
        return Err(fail(format!("partition count {} is not a power of two", partitions)));
    }

    let mut ring = RingSpec::replicated(ring_name, partitions.trailing_zeros(), replicas);
    ring.balance = Some(balance);
    ring.min_part_hours = text
        .lines()
        .find_map(parse_min_part_hours)
        .unwrap_or(DEFAULT_MIN_PART_HOURS);

    let mut lines = text.lines().skip_while(|l| !l.trim_start().starts_with("Devices:"));
    let mut devices = Vec::new();
    if let Some(header) = lines.next() {
        let layout = Layout::from_header(header);

        for line in lines {
            let spans = token_spans(line);
            let Some((_, first)) = spans.first() else {
                continue;
            };
            if first.parse::<u32>().is_err() {
                // trailing notes after the table
                break;
            }
            let device = parse_row(line, &spans, layout, region_name, ring_name)
                .map_err(|reason| fail(format!("{} in row {:?}", reason, line.trim())))?;
            devices.push(device);
        }
    }

    Ok(BuilderListing { ring, devices })
}

fn parse_summary(line: &str) -> std::result::Result<(u32, f64, f64), String> {
    let mut partitions = None;
    let mut replicas = None;
    let mut balance = 0.0;

    for part in line.split(',') {
        let mut fields = part.split_whitespace();
        let (Some(value), Some(label)) = (fields.next(), fields.next()) else {
            continue;
        };
        match label {
            "partitions" => partitions = value.parse::<u32>().ok(),
            "replicas" => replicas = value.parse::<f64>().ok(),
            "balance" => {
                balance = value
                    .parse::<f64>()
                    .map_err(|_| format!("invalid balance {:?}", value))?
            }
            _ => {}
        }
    }

    match (partitions, replicas) {
        (Some(p), Some(r)) => Ok((p, r, balance)),
        _ => Err(format!("unparsable summary line {:?}", line.trim())),
    }
}

fn parse_min_part_hours(line: &str) -> Option<u32> {
    let rest = line.split("reassigned is ").nth(1)?;
    rest.split_whitespace().next()?.parse().ok()
}

fn split_endpoint(value: &str) -> std::result::Result<(String, u16), String> {
    let (ip, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid endpoint {:?}", value))?;
    let ip = ip.trim_start_matches('[').trim_end_matches(']');
    let port = parse_port(port)?;
    Ok((ip.to_string(), port))
}

fn parse_port(value: &str) -> std::result::Result<u16, String> {
    value.parse().map_err(|_| format!("invalid port {:?}", value))
}

fn parse_num<T: std::str::FromStr>(value: &str, what: &str) -> std::result::Result<T, String> {
    value.parse().map_err(|_| format!("invalid {} {:?}", what, value))
}

fn parse_row(
    line: &str,
    spans: &[(usize, &str)],
    layout: Layout,
    region_name: &str,
    ring_name: &str,
) -> std::result::Result<Device, String> {
    let tokens: Vec<&str> = spans.iter().map(|(_, t)| *t).collect();
    let (server_ip, server_port, replication_ip, replication_port, rest) = match layout {
        Layout::Combined { .. } => {
            if tokens.len() < 10 {
                return Err(format!("expected at least 10 columns, got {}", tokens.len()));
            }
            let (ip, port) = split_endpoint(tokens[3])?;
            let (rip, rport) = split_endpoint(tokens[4])?;
            (ip, port, rip, rport, &tokens[5..])
        }
        Layout::Separate => {
            if tokens.len() < 11 {
                return Err(format!("expected at least 11 columns, got {}", tokens.len()));
            }
            let port = parse_port(tokens[4])?;
            let rport = parse_port(tokens[6])?;
            (tokens[3].to_string(), port, tokens[5].to_string(), rport, &tokens[7..])
        }
    };

    // rest: name weight partitions balance [flags] [meta]
    let drive_name = rest[0].to_string();
    let weight: f64 = parse_num(rest[1], "weight")?;
    let _partitions: u64 = parse_num(rest[2], "partition count")?;
    let balance: f64 = parse_num(rest[3], "balance")?;

    let (balance_start, balance_text) = spans[layout.balance_column()];
    let trailing = &line[balance_start + balance_text.len()..];
    let meta = match layout {
        // the flags cell may be blank, so meta is located by its offset
        Layout::Combined { flags_gap: Some(gap) } => trailing.get(gap..).unwrap_or_default(),
        _ => trailing,
    }
    .trim()
    .to_string();

    let (server_name, device_path) = Device::parse_meta(&meta).unwrap_or_default();

    Ok(Device {
        region_name: region_name.to_string(),
        ring_name: ring_name.to_string(),
        rack_id: None,
        region_id: parse_num(tokens[1], "region")?,
        zone_id: parse_num(tokens[2], "zone")?,
        server_name,
        server_ip,
        server_port,
        replication_ip,
        replication_port,
        group_type: GroupType::from_drive_name(&drive_name),
        drive_name,
        device_path,
        presence: Presence::Present,
        weight,
        balance,
        meta,
        backing: None,
        device_id: Some(parse_num(tokens[0], "device id")?),
    })
}
