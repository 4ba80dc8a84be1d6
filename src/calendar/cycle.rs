use chrono::NaiveDate;

use crate::model::element::Element;

pub const STEMS: [char; 10] = ['甲', '乙', '丙', '丁', '戊', '己', '庚', '辛', '壬', '癸'];
pub const BRANCHES: [char; 12] = [
    '子', '丑', '寅', '卯', '辰', '巳', '午', '未', '申', '酉', '戌', '亥',
];

/// Anchor day with a known pair: 2025-10-20 is 壬戌.
pub const ANCHOR_STEM_INDEX: usize = 8;
pub const ANCHOR_BRANCH_INDEX: usize = 10;

pub fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 20).expect("anchor date is a valid calendar date")
}

/// A day's position in the 10-stem and 12-branch cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CyclicPair {
    pub stem_index: usize,
    pub branch_index: usize,
}

impl CyclicPair {
    pub fn for_date(date: NaiveDate) -> Self {
        let delta = (date - anchor_date()).num_days();
        let stem_index = (ANCHOR_STEM_INDEX as i64 + delta).rem_euclid(STEMS.len() as i64);
        let branch_index = (ANCHOR_BRANCH_INDEX as i64 + delta).rem_euclid(BRANCHES.len() as i64);
        Self {
            stem_index: stem_index as usize,
            branch_index: branch_index as usize,
        }
    }

    pub fn stem(&self) -> char {
        STEMS[self.stem_index]
    }

    pub fn branch(&self) -> char {
        BRANCHES[self.branch_index]
    }

    pub fn code(&self) -> String {
        let mut s = String::with_capacity(6);
        s.push(self.stem());
        s.push(self.branch());
        s
    }

    /// Element dominated by the stem: two consecutive stems per element.
    pub fn stem_element(&self) -> Element {
        match self.stem_index / 2 {
            0 => Element::Wood,
            1 => Element::Fire,
            2 => Element::Earth,
            3 => Element::Metal,
            _ => Element::Water,
        }
    }

    /// Element receiving the branch bonus.
    pub fn branch_element(&self) -> Element {
        match self.branch() {
            '子' | '亥' => Element::Water,
            '寅' | '卯' => Element::Wood,
            '巳' | '午' => Element::Fire,
            '申' | '酉' => Element::Metal,
            _ => Element::Earth,
        }
    }
}

impl std::fmt::Display for CyclicPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.stem(), self.branch())
    }
}
