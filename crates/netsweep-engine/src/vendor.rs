//! Hardware vendor lookup from the MAC OUI prefix.

// (prefix, vendor); prefixes are uppercase and colon-separated.
const OUI_TABLE: &[(&str, &str)] = &[
    ("00:0C:29", "VMware"),
    ("00:50:56", "VMware"),
    ("00:1A:11", "Google"),
    ("58:A0:23", "Google"),
    ("E4:F0:42", "Google"),
    ("3C:22:FB", "Apple"),
    ("A8:66:7F", "Apple"),
    ("D8:BB:2C", "Apple"),
    ("34:36:3B", "Apple"),
    ("F4:5C:89", "Apple"),
    ("C8:2A:14", "Apple"),
    ("B8:27:EB", "Raspberry"),
    ("DC:A6:32", "Raspberry"),
    ("E4:5F:01", "Raspberry"),
    ("F0:B4:29", "Xiaomi"),
    ("18:FE:34", "Espressif"),
    ("3C:71:BF", "Espressif"),
    ("8C:AA:B5", "Samsung"),
    ("5C:F3:70", "Samsung"),
    ("00:17:88", "Philips"),
    ("EC:B5:FA", "Philips"),
    ("00:14:A8", "Sonos"),
    ("B8:E9:37", "Sonos"),
    ("B8:F0:09", "Amazon"),
    ("FC:65:DE", "Amazon"),
];

/// Vendor for a MAC in `AA:BB:CC:DD:EE:FF` form (dashes and lowercase are
/// accepted too).
pub fn lookup_vendor(mac: &str) -> Option<&'static str> {
    let normalized = mac.trim().replace('-', ":").to_ascii_uppercase();
    let prefix = normalized.get(..8)?;
    OUI_TABLE
        .iter()
        .find(|(oui, _)| *oui == prefix)
        .map(|(_, vendor)| *vendor)
}

/// Hostname derived from the MAC when reverse DNS has nothing,
/// e.g. `Apple-3C-22-FB-01-02-03` or `MAC-00-11-22-33-44-55`.
pub fn mac_hostname(mac: &str, vendor: Option<&str>) -> String {
    let dashed = mac.trim().replace(':', "-").to_ascii_uppercase();
    format!("{}-{dashed}", vendor.unwrap_or("MAC"))
}
