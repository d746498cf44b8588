//! Unit suffix parsing and formatting.
//!
//! `m`/`mib` = 1 MiB; `M`/`mb` = SI megabyte converted to MiB; `g`/`gib` =
//! 1024 MiB; `G`/`gb` = SI gigabyte converted to MiB; `t`/`tib` = 2^20 MiB;
//! `T`/`tb` = SI terabyte converted to MiB. Bare numbers are MiB.

use crate::errors::IoError;

const MIB: u64 = 1_048_576;

/// `siConvert x = x * 1_000_000 / 1_048_576`, integer division.
fn si_convert(x: u64) -> u64 {
    x * 1_000_000 / MIB
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    Some(match unit {
        "" | "m" | "mib" => 1,
        "M" | "mb" => si_convert(1),
        "g" | "gib" => 1024,
        "G" | "gb" => si_convert(1000) * 1024,
        "t" | "tib" => MIB,
        "T" | "tb" => si_convert(1_000_000),
        _ => return None,
    })
}

/// Parse a quantity with an optional unit suffix into MiB. Accepts
/// an optional single space between the number and the unit (e.g. `"2 GiB"`).
pub fn parse_unit(s: &str) -> Result<u64, IoError> {
    let s = s.trim();
    let split_at = s
.find(|c: char| !c.is_ascii_digit())
.unwrap_or(s.len());
    let (num, rest) = s.split_at(split_at);
    let num: u64 = num
.parse()
.map_err(|_| IoError::BadQuantity(s.to_string()))?;
    let unit = rest.trim_start();
    let mult = unit_multiplier(unit).ok_or_else(|| IoError::UnknownUnit(unit.to_string()))?;
    Ok(num * mult)
}

/// Render `n` MiB using unit `unit`. Inverse of [`parse_unit`] only when `n`
/// is an exact multiple of the unit's multiplier (always true for `m`/`mib`,
/// whose multiplier is 1; for `g`/`t`-family units the division here is
/// integer and therefore lossy for `n` that doesn't divide evenly).
pub fn format_unit(n: u64, unit: &str) -> Result<String, IoError> {
    let mult = unit_multiplier(unit).ok_or_else(|| IoError::UnknownUnit(unit.to_string()))?;
    if mult == 0 {
        return Err(IoError::UnknownUnit(unit.to_string()));
    }
    Ok(format!("{}{unit}", n / mult))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_examples_from_spec() {
        assert_eq!(parse_unit("1024m").unwrap(), 1024);
        assert_eq!(parse_unit("1M").unwrap(), 0);
        assert_eq!(parse_unit("1G").unwrap(), 953);
        assert_eq!(parse_unit("1g").unwrap(), 1024);
        assert_eq!(parse_unit("1t").unwrap(), 1_048_576);
        assert_eq!(parse_unit("2 GiB").unwrap(), 2048);
    }

    #[test]
    fn round_trips_through_clean_units() {
        for n in [0u64, 1, 64, 4096, 1_048_576] {
            assert_eq!(parse_unit(&format_unit(n, "m").unwrap()).unwrap(), n);
        }
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(matches!(parse_unit("5q"), Err(IoError::UnknownUnit(_))));
    }

    proptest::proptest! {
        /// P9, as it actually holds given integer-division formatting: the
        /// round trip is exact whenever `n` is a multiple of the unit's own
        /// multiplier, for every recognised unit.
        #[test]
        fn unit_round_trip_holds_for_exact_multiples(steps in 0u64..4096, unit_pick in 0usize..6) {
            let unit = ["m", "M", "g", "G", "t", "T"][unit_pick];
            let mult = unit_multiplier(unit).unwrap();
            if mult == 0 {
                return Ok(());
            }
            let n = steps * mult;
            let rendered = format_unit(n, unit).unwrap();
            prop_assert_eq!(parse_unit(&rendered).unwrap(), n);
        }
    }
}
