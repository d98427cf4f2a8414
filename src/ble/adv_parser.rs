use heapless::String;

use crate::config::PEER_NAME_MAX;

const AD_TYPE_UUIDS128_INCOMPLETE: u8 = 0x06;
const AD_TYPE_UUIDS128_COMPLETE: u8 = 0x07;
const AD_TYPE_NAME_SHORTENED: u8 = 0x08;
const AD_TYPE_NAME_COMPLETE: u8 = 0x09;

/// Iterator over the AD structures of a raw advertisement payload.
///
/// Yields `(ad_type, payload)` pairs and stops at the first malformed
/// length field (zero or running past the end of the data).
struct AdStructures<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.data.first()? as usize;
        if len == 0 || self.data.len() < len + 1 {
            return None;
        }
        let (entry, rest) = self.data.split_at(len + 1);
        self.data = rest;
        Some((entry[1], &entry[2..]))
    }
}

/// Check whether the advertisement lists the given 128-bit service UUID
/// (wire order) in a complete or incomplete 128-bit UUID list.
pub fn contains_service_uuid(data: &[u8], uuid: &[u8; 16]) -> bool {
    AdStructures { data }.any(|(ad_type, payload)| {
        (ad_type == AD_TYPE_UUIDS128_INCOMPLETE || ad_type == AD_TYPE_UUIDS128_COMPLETE)
            && payload.chunks_exact(16).any(|chunk| chunk == uuid)
    })
}

/// Extract the complete/shortened local name from advertisement data,
/// truncated to `PEER_NAME_MAX` bytes.  Absence is not an error; the
/// `"Unknown"` sentinel is returned instead.
pub fn extract_device_name(data: &[u8]) -> String<PEER_NAME_MAX> {
    let mut name = String::new();
    let found = AdStructures { data }
        .find(|(ad_type, _)| *ad_type == AD_TYPE_NAME_SHORTENED || *ad_type == AD_TYPE_NAME_COMPLETE);

    match found {
        Some((_, bytes)) => {
            for &b in bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
        }
        None => {
            let _ = name.push_str("Unknown");
        }
    }
    name
}
