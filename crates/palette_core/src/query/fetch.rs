//! Fetch request description and its SQL ordering clause.

use crate::model::color_item::{ColorItem, EntityName};

/// Attribute a fetch can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// The `hex` color code, compared bytewise.
    Hex,
    /// Order in which records were first committed.
    InsertionOrder,
}

impl SortKey {
    fn column(self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::InsertionOrder => "seq",
        }
    }
}

/// One `(key, direction)` pair of a fetch ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            ascending: true,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            ascending: false,
        }
    }
}

/// Which records to load and how to order them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub entity: EntityName,
    pub sort: Vec<SortDescriptor>,
}

impl FetchRequest {
    /// All color items, in insertion order unless sort keys are added.
    pub fn color_items() -> Self {
        Self {
            entity: ColorItem::ENTITY,
            sort: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, descriptor: SortDescriptor) -> Self {
        self.sort.push(descriptor);
        self
    }

    /// Builds the `ORDER BY` clause, always ending with the insertion-order
    /// tie-break.
    pub(crate) fn order_by_sql(&self) -> String {
        let mut terms: Vec<String> = Vec::with_capacity(self.sort.len() + 1);
        let mut has_seq = false;
        for descriptor in &self.sort {
            if descriptor.key == SortKey::InsertionOrder {
                if has_seq {
                    continue;
                }
                has_seq = true;
            }
            let direction = if descriptor.ascending { "ASC" } else { "DESC" };
            terms.push(format!("{} {direction}", descriptor.key.column()));
        }
        if !has_seq {
            terms.push("seq ASC".to_string());
        }
        format!("ORDER BY {}", terms.join(", "))
    }
}
