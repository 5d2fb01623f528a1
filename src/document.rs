// Host side model of a page: table elements and search boxes by id.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stripe {
    Even,
    Odd,
}

impl Stripe {
    pub fn class_name(&self) -> &'static str {
        match self {
            Stripe::Even => "bg-light",
            Stripe::Odd => "bg-white",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub column: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub search_key: Option<String>,
    pub hidden: bool,
    pub stripe: Option<Stripe>,
    pub link: Option<String>,
}

impl Row {
    pub fn new<C: Into<String>, T: Into<String>>(cells: Vec<(C, T)>) -> Self {
        Row {
            cells: cells
                .into_iter()
                .map(|(column, text)| Cell {
                    column: column.into(),
                    text: text.into(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_search_key(mut self, key: impl Into<String>) -> Self {
        self.search_key = Some(key.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Text content of the cell bound to `column`, if the row has one.
    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.text.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HeaderCell {
    pub title: String,
    pub column: Option<String>,
    pub sortable: bool,
}

impl HeaderCell {
    pub fn sortable(column: impl Into<String>) -> Self {
        let column = column.into();
        HeaderCell {
            title: column.clone(),
            column: Some(column),
            sortable: true,
        }
    }

    pub fn plain(title: impl Into<String>) -> Self {
        HeaderCell {
            title: title.into(),
            column: None,
            sortable: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableElement {
    pub id: String,
    pub headers: Vec<HeaderCell>,
    pub body: Vec<Row>,
}

impl TableElement {
    pub fn new(id: impl Into<String>, headers: Vec<HeaderCell>, body: Vec<Row>) -> Self {
        TableElement {
            id: id.into(),
            headers,
            body,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchBox {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct Document {
    pub title: String,
    tables: Vec<TableElement>,
    search_boxes: Vec<SearchBox>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Document {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: TableElement) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_search_box(mut self, id: impl Into<String>) -> Self {
        self.search_boxes.push(SearchBox {
            id: id.into(),
            value: String::new(),
        });
        self
    }

    /// Removes the table with the given id, handing its ownership to the caller.
    pub fn take_table(&mut self, id: &str) -> Option<TableElement> {
        let pos = self.tables.iter().position(|t| t.id == id)?;
        Some(self.tables.remove(pos))
    }

    pub fn has_search_box(&self, id: &str) -> bool {
        self.search_boxes.iter().any(|b| b.id == id)
    }

    pub fn into_search_boxes(self) -> Vec<SearchBox> {
        self.search_boxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_lookup_by_column() {
        let row = Row::new(vec![("Song", "Halo"), ("Main Artist", "Beyoncé")]);
        assert_eq!(row.cell("Main Artist"), Some("Beyoncé"));
        assert_eq!(row.cell("BPM"), None);
    }

    #[test]
    fn take_table_removes_it() {
        let mut doc = Document::new("t")
            .with_table(TableElement::new("a", vec![], vec![]))
            .with_search_box("search-box");
        assert!(doc.take_table("a").is_some());
        assert!(doc.take_table("a").is_none());
        assert!(doc.has_search_box("search-box"));
        assert!(!doc.has_search_box("search-box-all"));
    }
}
