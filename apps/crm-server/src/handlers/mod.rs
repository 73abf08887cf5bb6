pub mod activities;
pub mod analytics;
pub mod auth;
pub mod contacts;
pub mod deals;
pub mod health;
pub mod organizations;
pub mod tasks;

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_page_size() -> i64 {
    20
}

/// Offset/limit window shared by the listing endpoints. The raw
/// page/page_size fields live directly on each query struct because
/// serde_urlencoded cannot deserialize numbers behind #[serde(flatten)].
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    page: i64,
    page_size: i64,
}

impl PageParams {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_math_clamps_and_offsets() {
        assert_eq!(PageParams::new(1, 20).offset(), 0);
        assert_eq!(PageParams::new(3, 10).offset(), 20);

        let out_of_range = PageParams::new(0, 1000);
        assert_eq!(out_of_range.offset(), 0);
        assert_eq!(out_of_range.limit(), 100);
    }
}
