use isocountry::CountryCode;

use crate::traits::CountryLookup;

/// User-assigned codes HDX treats as countries.
const EXTRA_COUNTRIES: &[(&str, &str)] = &[("XKX", "Kosovo")];

/// Country names from the ISO 3166-1 table, plus Kosovo (`XKX`).
///
/// ```
/// use geonode_core::{CountryLookup, IsoCountryLookup};
///
/// assert_eq!(IsoCountryLookup.country_name("sdn").as_deref(), Some("Sudan"));
/// assert_eq!(IsoCountryLookup.country_name("SAF"), None);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoCountryLookup;

impl CountryLookup for IsoCountryLookup {
    fn country_name(&self, iso3: &str) -> Option<String> {
        let iso3 = iso3.trim().to_uppercase();
        if let Ok(code) = CountryCode::for_alpha3(&iso3) {
            return Some(code.name().to_string());
        }
        EXTRA_COUNTRIES
            .iter()
            .find(|(code, _)| *code == iso3)
            .map(|(_, name)| name.to_string())
    }
}
