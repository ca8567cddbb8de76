//! Offset/size pagination over a [`QueryWrapper`].

use crate::results::Row;
use crate::wrapper::QueryWrapper;

/// One page of a windowed query.
///
/// The page owns a clone of the wrapper and keeps its trailing clause set
/// to `LIMIT <size> OFFSET <offset>`. `total` and `records` are populated
/// by whoever runs the queries (see `Repository::select_page`); the page
/// itself never talks to a database.
#[derive(Debug, Clone)]
pub struct Page {
    pub offset: usize,
    pub size: usize,
    pub total: usize,
    pub records: Vec<Row>,
    wrapper: QueryWrapper,
}

impl Page {
    #[must_use]
    pub fn new(wrapper: &QueryWrapper, offset: usize, size: usize) -> Self {
        let mut page = Page {
            offset,
            size,
            total: 0,
            records: Vec::new(),
            wrapper: wrapper.clone(),
        };
        page.structure();
        page
    }

    fn structure(&mut self) {
        self.wrapper
            .set_last(format!("LIMIT {} OFFSET {}", self.size, self.offset));
    }

    /// Advance one page, but only while a full window still fits below
    /// `total`; on the final page the offset stays put.
    pub fn next(&mut self) -> &mut Self {
        if self.total >= self.offset + self.size {
            self.offset += self.size;
            self.records.clear();
            self.structure();
        }
        self
    }

    /// Step back one page, clamping at zero.
    pub fn prev(&mut self) -> &mut Self {
        self.offset = self.offset.saturating_sub(self.size);
        self.records.clear();
        self.structure();
        self
    }

    /// The wrapper with the current window's trailing clause applied.
    #[must_use]
    pub fn wrapper(&self) -> &QueryWrapper {
        &self.wrapper
    }
}
