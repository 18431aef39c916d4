use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::domain::Student;
use super::normalize::normalize;

/// A known elective with the keywords that identify it in free-text option columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOption {
    pub id: &'static str,
    pub badge: &'static str,
    pub keywords: &'static [&'static str],
}

const CATALOG: &[CatalogOption] = &[
    CatalogOption {
        id: "lca",
        badge: "LCA",
        keywords: &["latin", "lca latin"],
    },
    CatalogOption {
        id: "grec",
        badge: "Grec",
        keywords: &["grec", "lca grec"],
    },
    CatalogOption {
        id: "euro",
        badge: "Euro",
        keywords: &["section euro", "euro"],
    },
    CatalogOption {
        id: "math_comp",
        badge: "Maths C.",
        keywords: &["maths complementaires", "maths comp."],
    },
    CatalogOption {
        id: "math_exp",
        badge: "Maths X.",
        keywords: &["maths expertes", "maths exp."],
    },
    CatalogOption {
        id: "all_lv1",
        badge: "All.LV1",
        keywords: &["allemand lv1", "all lv1"],
    },
    CatalogOption {
        id: "all_lv2",
        badge: "ALL",
        keywords: &["allemand lv2", "all lv2"],
    },
    CatalogOption {
        id: "ses",
        badge: "SES",
        keywords: &["ses"],
    },
    CatalogOption {
        id: "pc_spc",
        badge: "PC",
        keywords: &["physique-chimie", "pc"],
    },
    CatalogOption {
        id: "svt_spc",
        badge: "SVT",
        keywords: &["svt", "sciences de la vie et de la terre"],
    },
    CatalogOption {
        id: "hlp_spc",
        badge: "HLP",
        keywords: &["hlp", "humanités, littérature et philosophie"],
    },
    CatalogOption {
        id: "hggsp_spc",
        badge: "HGGSP",
        keywords: &[
            "hggsp",
            "histoire-géographie, géopolitique et sciences politiques",
        ],
    },
    CatalogOption {
        id: "llcer_spc",
        badge: "LLCER",
        keywords: &["llcer"],
    },
];

static CATALOG_BY_ID: OnceLock<HashMap<&'static str, &'static CatalogOption>> = OnceLock::new();

pub fn catalog() -> &'static [CatalogOption] {
    CATALOG
}

pub fn catalog_option(id: &str) -> Option<&'static CatalogOption> {
    CATALOG_BY_ID
        .get_or_init(|| CATALOG.iter().map(|option| (option.id, option)).collect())
        .get(id)
        .copied()
}

impl CatalogOption {
    fn held_by(&self, options: &[String]) -> bool {
        self.keywords
            .iter()
            .any(|keyword| options.iter().any(|option| option.contains(&normalize(keyword))))
    }
}

/// Keyword set a rule uses to recognise an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSelector {
    pub keywords: Vec<String>,
    pub display_name: String,
}

impl OptionSelector {
    pub fn catalog(id: &str) -> Option<Self> {
        catalog_option(id).map(|option| Self {
            keywords: option.keywords.iter().map(|k| k.to_string()).collect(),
            display_name: option.badge.to_string(),
        })
    }

    /// Substring match of any keyword against any option, ignoring case and accents.
    pub fn matches(&self, student: &Student) -> bool {
        let options: Vec<String> = student.normalized_options().collect();
        self.keywords
            .iter()
            .map(|keyword| normalize(keyword.trim()))
            .filter(|keyword| !keyword.is_empty())
            .any(|keyword| options.iter().any(|option| option.contains(&keyword)))
    }
}

/// Badges for the catalog options a student holds, in catalog order.
pub fn option_badges(student: &Student) -> Vec<&'static str> {
    let options: Vec<String> = student.normalized_options().collect();
    CATALOG
        .iter()
        .filter(|entry| entry.held_by(&options))
        .map(|entry| entry.badge)
        .collect()
}
