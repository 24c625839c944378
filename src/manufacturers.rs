//! KNX manufacturer ID lookup, read from `PID_MANUFACTURER_ID` (interface
//! objects) or memory address `0x0104` (System 1/2 devices without
//! interface objects).

/// Looks up the display name for a KNX manufacturer ID. Unknown IDs
/// render as `"Unknown (0x{id:04x})"` by the caller rather than here, so
/// this stays a pure lookup.
pub fn manufacturer_name(id: u16) -> Option<&'static str> {
    Some(match id {
        1 => "Siemens",
        2 => "ABB",
        4 => "Albrecht Jung",
        5 => "Bticino",
        6 => "Berker",
        7 => "Busch-Jaeger Elektro",
        8 => "GIRA Giersiepen",
        9 => "Hager Electro",
        10 => "INSTA ELEKTRO",
        11 => "LEGRAND Appareillage electrique",
        12 => "Merten",
        14 => "ABB SpA-SACE Division",
        22 => "Siedle & Sohne",
        24 => "Eberle",
        25 => "GEWISS",
        28 => "Albert Ackermann",
        29 => "Schupa GmbH",
        30 => "ABB SCHWEIZ",
        32 => "Feller",
        36 => "Gewiss",
        42 => "Insta GmbH",
        52 => "MDT technologies",
        66 => "Insta Elektro GmbH",
        69 => "Theben HTS",
        76 => "Berker GmbH & Co KG",
        78 => "IS-Systems",
        83 => "ABB STOTZ-KONTAKT",
        85 => "Busch-Jaeger Elektro",
        89 => "Basalte",
        100 => "WAGO Kontakttechnik",
        122 => "JSB MECHATRONIC",
        131 => "Finder",
        133 => "WAREMA",
        135 => "Eelectron",
        146 => "Arcus-eds",
        147 => "Intesis",
        160 => "Ekinex",
        166 => "PulseEight",
        217 => "WALTHER-WERKE",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve() {
        assert_eq!(manufacturer_name(1), Some("Siemens"));
        assert_eq!(manufacturer_name(2), Some("ABB"));
    }

    #[test]
    fn unknown_id_is_none() {
        assert_eq!(manufacturer_name(0xffff), None);
    }
}
