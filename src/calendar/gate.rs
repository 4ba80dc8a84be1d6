use super::cycle::CyclicPair;

/// The eight gates, in alphabet order 開休生傷杜景死驚.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Open,
    Rest,
    Life,
    Harm,
    Block,
    View,
    Death,
    Fright,
}

impl Gate {
    pub const ALL: [Gate; 8] = [
        Gate::Open,
        Gate::Rest,
        Gate::Life,
        Gate::Harm,
        Gate::Block,
        Gate::View,
        Gate::Death,
        Gate::Fright,
    ];

    pub fn symbol(self) -> char {
        match self {
            Gate::Open => '開',
            Gate::Rest => '休',
            Gate::Life => '生',
            Gate::Harm => '傷',
            Gate::Block => '杜',
            Gate::View => '景',
            Gate::Death => '死',
            Gate::Fright => '驚',
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::ALL.into_iter().find(|g| g.symbol() == c)
    }

    /// Gate index is the sum of the pair's two code points, mod 8.
    pub fn for_pair(pair: &CyclicPair) -> Self {
        let idx = (pair.stem() as u32 + pair.branch() as u32) as usize % Self::ALL.len();
        Self::ALL[idx]
    }

    /// Fixed score bonus or penalty carried by the gate.
    pub fn adjustment(self) -> f64 {
        match self {
            Gate::Open => 0.05,
            Gate::Rest => 0.02,
            Gate::Life => 0.03,
            Gate::Harm => -0.03,
            Gate::Block => -0.02,
            Gate::View => 0.01,
            Gate::Death => -0.05,
            Gate::Fright => -0.04,
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A day's gate as carried by its features. Computed days always name one
/// of the eight gates; an override may carry any text, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GateLabel {
    Known(Gate),
    Unlisted(String),
}

impl GateLabel {
    /// Trimmed cell text; empty means no gate at all.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        Some(match Gate::from_symbol(s) {
            Some(gate) => GateLabel::Known(gate),
            None => GateLabel::Unlisted(s.to_string()),
        })
    }

    pub fn known(&self) -> Option<Gate> {
        match self {
            GateLabel::Known(gate) => Some(*gate),
            GateLabel::Unlisted(_) => None,
        }
    }

    /// Unlisted text carries no adjustment.
    pub fn adjustment(&self) -> f64 {
        self.known().map(Gate::adjustment).unwrap_or(0.0)
    }
}

impl From<Gate> for GateLabel {
    fn from(gate: Gate) -> Self {
        GateLabel::Known(gate)
    }
}

impl std::fmt::Display for GateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateLabel::Known(gate) => write!(f, "{}", gate),
            GateLabel::Unlisted(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trip() {
        for g in Gate::ALL {
            assert_eq!(Gate::from_symbol(&g.symbol().to_string()), Some(g));
        }
        assert_eq!(Gate::from_symbol(" 開 "), Some(Gate::Open));
        assert_eq!(Gate::from_symbol(""), None);
        assert_eq!(Gate::from_symbol("開休"), None);
        assert_eq!(Gate::from_symbol("x"), None);
    }

    #[test]
    fn adjustments_stay_small() {
        for g in Gate::ALL {
            assert!(g.adjustment().abs() <= 0.05 + f64::EPSILON);
        }
    }

    #[test]
    fn label_keeps_unlisted_text_verbatim() {
        assert_eq!(GateLabel::parse(" 休 "), Some(GateLabel::Known(Gate::Rest)));
        assert_eq!(GateLabel::parse("  "), None);

        let label = GateLabel::parse(" 門 ").unwrap();
        assert_eq!(label, GateLabel::Unlisted("門".to_string()));
        assert_eq!(label.known(), None);
        assert_eq!(label.adjustment(), 0.0);
        assert_eq!(label.to_string(), "門");

        assert_eq!(GateLabel::from(Gate::Death).adjustment(), -0.05);
    }

    #[test]
    fn pair_hash_uses_code_points() {
        let pair = CyclicPair {
            stem_index: 8,
            branch_index: 10,
        };
        let expected = ('壬' as u32 + '戌' as u32) as usize % 8;
        assert_eq!(Gate::for_pair(&pair), Gate::ALL[expected]);
    }
}
