use tracing::{debug, trace, warn};

use crate::document::{Document, Row, TableElement};
use crate::search::filter_rows;
use crate::sorter::{
    ColumnKinds, HeaderState, SortDirection, activate_header, sort_by_column, sort_by_columns,
};
use crate::striper::apply_striping;

pub const SONGS_TABLE: &str = "songs-table";
pub const SONGS_TABLE_ALL: &str = "songs-table-all";
pub const STATS_TABLE: &str = "stats-table";
pub const SEARCH_BOX: &str = "search-box";
pub const SEARCH_BOX_ALL: &str = "search-box-all";

pub const DEFAULT_SORT: [&str; 2] = ["Main Artist", "Song"];

/// Pairs a table id with the search box that filters it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBinding {
    pub table_id: String,
    pub search_box_id: Option<String>,
}

impl TableBinding {
    pub fn new(table_id: impl Into<String>, search_box_id: Option<&str>) -> Self {
        TableBinding {
            table_id: table_id.into(),
            search_box_id: search_box_id.map(str::to_string),
        }
    }

    /// Binding with the usual search box: the songs table of a single
    /// category page has its own box, every other table uses the shared one.
    pub fn for_table(table_id: &str) -> Self {
        let search_box = if table_id == SONGS_TABLE {
            SEARCH_BOX
        } else {
            SEARCH_BOX_ALL
        };
        TableBinding::new(table_id, Some(search_box))
    }
}

pub fn default_bindings() -> Vec<TableBinding> {
    [SONGS_TABLE, SONGS_TABLE_ALL, STATS_TABLE]
        .iter()
        .map(|id| TableBinding::for_table(id))
        .collect()
}

/// Search and sort behaviour of one table.
///
/// Owns the row snapshot taken at setup. The order of `rows` is the order
/// the table body shows; filtering only toggles `Row::hidden`.
#[derive(Debug)]
pub struct TableController {
    id: String,
    search_box: Option<String>,
    rows: Vec<Row>,
    headers: Vec<HeaderState>,
    kinds: ColumnKinds,
}

impl TableController {
    pub fn attach(table: TableElement, search_box: Option<String>, kinds: &ColumnKinds) -> Self {
        let headers = table
            .headers
            .iter()
            .filter(|h| h.sortable)
            .filter_map(|h| {
                h.column
                    .as_ref()
                    .map(|column| HeaderState::new(h.title.clone(), column.clone()))
            })
            .collect::<Vec<_>>();
        debug!(
            "Attaching table {:?}: {} rows, {} sortable headers, search box {:?}",
            table.id,
            table.body.len(),
            headers.len(),
            search_box
        );
        let mut controller = TableController {
            id: table.id,
            search_box,
            rows: table.body,
            headers,
            kinds: kinds.clone(),
        };
        controller.sort_by_columns(&DEFAULT_SORT);
        controller
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn search_box(&self) -> Option<&str> {
        self.search_box.as_deref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| !r.hidden)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows().count()
    }

    pub fn headers(&self) -> &[HeaderState] {
        &self.headers
    }

    pub fn active_header(&self) -> Option<&HeaderState> {
        self.headers.iter().find(|h| h.active)
    }

    /// Live search: show the rows whose search key contains `query`.
    pub fn filter(&mut self, query: &str) {
        let evaluated = filter_rows(&mut self.rows, query);
        trace!(
            "Filter {:?} on {}: {} rows evaluated, {} visible",
            query,
            self.id,
            evaluated,
            self.visible_count()
        );
        apply_striping(&mut self.rows);
    }

    /// Header click on `column`. Returns the direction sorted with, or `None`
    /// if the column has no sortable header.
    pub fn click_header(&mut self, column: &str) -> Option<SortDirection> {
        let idx = self.headers.iter().position(|h| h.column == column)?;
        Some(self.click_header_at(idx))
    }

    /// Header click on the n-th sortable header.
    pub fn click_header_at(&mut self, idx: usize) -> SortDirection {
        let direction = activate_header(&mut self.headers, idx);
        let column = self.headers[idx].column.clone();
        let kind = self.kinds.kind_of(&column);
        sort_by_column(&mut self.rows, &column, kind, direction);
        apply_striping(&mut self.rows);
        direction
    }

    /// Multi-key ascending sort, used for the initial order. Header state is
    /// not touched.
    pub fn sort_by_columns(&mut self, columns: &[&str]) {
        sort_by_columns(&mut self.rows, columns, &self.kinds);
        apply_striping(&mut self.rows);
    }
}

/// Creates a controller for every binding whose table exists in `document`.
/// Missing tables are logged and skipped; a missing search box only disables
/// searching for that table.
pub fn initialize(
    document: &mut Document,
    bindings: &[TableBinding],
    kinds: &ColumnKinds,
) -> Vec<TableController> {
    let mut controllers = Vec::new();
    for binding in bindings {
        let Some(table) = document.take_table(&binding.table_id) else {
            warn!("Table with id '{}' not found.", binding.table_id);
            continue;
        };
        let search_box = binding
            .search_box_id
            .as_ref()
            .filter(|id| document.has_search_box(id))
            .cloned();
        controllers.push(TableController::attach(table, search_box, kinds));
    }
    controllers
}
