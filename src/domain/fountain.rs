/// BWB fountain model classification based on the WFS `typ` property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FountainType {
    Kaiser,
    Wiener,
    Botsch,
    Bituma,
    Unknown,
}

impl FountainType {
    /// Classify a `typ` value into a FountainType
    pub fn from_typ(typ: &str) -> FountainType {
        match typ.trim() {
            "Kaiser Brunnen" => FountainType::Kaiser,
            "Wiener Brunnen" => FountainType::Wiener,
            "Botsch Brunnen" => FountainType::Botsch,
            "Bituma-Brunnen" | "Bituma Brunnen" => FountainType::Bituma,
            _ => FountainType::Unknown,
        }
    }

    /// Marker colour on the fountain type map
    pub fn color(self) -> &'static str {
        match self {
            FountainType::Kaiser => "blue",
            FountainType::Wiener => "green",
            FountainType::Botsch => "red",
            FountainType::Bituma => "purple",
            FountainType::Unknown => "gray",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fountain_type_from_typ() {
        assert_eq!(FountainType::from_typ("Kaiser Brunnen"), FountainType::Kaiser);
        assert_eq!(FountainType::from_typ("Wiener Brunnen "), FountainType::Wiener);
        assert_eq!(FountainType::from_typ("Bituma-Brunnen"), FountainType::Bituma);
        assert_eq!(FountainType::from_typ("Schwengelpumpe"), FountainType::Unknown);
        assert_eq!(FountainType::from_typ(""), FountainType::Unknown);
    }

    #[test]
    fn test_fountain_type_color() {
        assert_eq!(FountainType::Botsch.color(), "red");
        assert_eq!(FountainType::Unknown.color(), "gray");
    }
}
