use std::collections::HashMap;

use crate::models::Candidate;

/// Direct subcategory-to-icon mappings, checked before the category lists.
const SUBCATEGORY_ICONS: &[(&str, &str)] = &[
    ("museum", "🏛️"),
    ("church", "⛪"),
    ("castle", "🏰"),
    ("beach", "🏖️"),
    ("market", "🧺"),
    ("winery", "🍷"),
    ("tapas", "🍢"),
    ("viewpoint", "🌅"),
    ("marina", "⛵"),
    ("hiking", "🥾"),
    ("diving", "🤿"),
    ("golf", "⛳"),
    ("cafe", "☕"),
    ("bakery", "🥐"),
    ("nightclub", "🪩"),
    ("aquarium", "🐠"),
];

/// Per-category icon pools; the assigner rotates through these by lowest
/// usage count so one screen of results does not visibly repeat icons.
const CATEGORY_ICONS: &[(&str, &[&str])] = &[
    ("culture", &["🏛️", "🎭", "🖼️", "⛪"]),
    ("food", &["🍽️", "🍷", "🥘", "🦐"]),
    ("restaurant", &["🍽️", "🍷", "🥘", "🦐"]),
    ("nature", &["🌿", "🏞️", "🌊", "🦜"]),
    ("beach", &["🏖️", "🌊", "🏄", "⛱️"]),
    ("active", &["🚴", "🥾", "🧗", "⛵"]),
    ("shopping", &["🛍️", "🏬", "🎁"]),
    ("nightlife", &["🍸", "🎶", "🌙"]),
    ("event", &["🎉", "🎪", "🎟️"]),
];

const FALLBACK_ICONS: &[&str] = &["📍", "⭐", "🧭"];

/// Assigns visually distinct icons within one result set.
///
/// Round-robin-by-least-used-count, not a global optimization: direct
/// subcategory hits win outright, otherwise the least-used icon from the
/// category's pool is taken (ties broken by list order).
pub struct IconAssigner {
    usage: HashMap<&'static str, usize>,
}

impl IconAssigner {
    pub fn new() -> Self {
        Self {
            usage: HashMap::new(),
        }
    }

    pub fn assign(&mut self, category: &str, subcategory: Option<&str>) -> &'static str {
        let icon = self
            .direct_match(subcategory)
            .unwrap_or_else(|| self.least_used(category_pool(category)));
        *self.usage.entry(icon).or_insert(0) += 1;
        icon
    }

    fn direct_match(&self, subcategory: Option<&str>) -> Option<&'static str> {
        let subcategory = subcategory?.to_lowercase();
        SUBCATEGORY_ICONS
            .iter()
            .find(|(keyword, _)| subcategory.contains(keyword))
            .map(|(_, icon)| *icon)
    }

    fn least_used(&self, pool: &'static [&'static str]) -> &'static str {
        pool.iter()
            .min_by_key(|icon| self.usage.get(*icon).copied().unwrap_or(0))
            .copied()
            .unwrap_or(FALLBACK_ICONS[0])
    }
}

impl Default for IconAssigner {
    fn default() -> Self {
        Self::new()
    }
}

fn category_pool(category: &str) -> &'static [&'static str] {
    let category = category.to_lowercase();
    CATEGORY_ICONS
        .iter()
        .find(|(keyword, _)| category.contains(keyword))
        .map(|(_, pool)| *pool)
        .unwrap_or(FALLBACK_ICONS)
}

/// Annotates a result set of candidates, in order.
pub fn assign_icons(items: &mut [Candidate]) {
    let mut assigner = IconAssigner::new();
    for item in items {
        let icon = assigner.assign(&item.category, item.subcategory.as_deref());
        item.icon = Some(icon.to_string());
    }
}
