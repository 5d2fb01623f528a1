use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace};

use crate::catalog::{Catalog, Category};
use crate::document::{Document, SearchBox, Stripe};
use crate::domain::{CMDMode, Config, HELP_TEXT, Message, SongError};
use crate::inputter::{InputResult, Inputter};
use crate::sorter::SortDirection;
use crate::table::{TableController, default_bindings, initialize};
use crate::ui::CHROME_HEIGHT;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, PartialEq)]
enum PageKind {
    Home,
    Category(Category),
    Subcategory(Category, String),
}

/// One entry of the navigation stack: the controllers created for a document
/// plus the cursor state of the view.
struct Page {
    kind: PageKind,
    title: String,
    controllers: Vec<TableController>,
    search_boxes: Vec<SearchBox>,
    active: usize,
    cursor_row: usize, // Index into the visible rows
    offset_row: usize,
    cursor_header: usize,
}

impl Page {
    fn open(kind: PageKind, mut document: Document, config: &Config) -> Self {
        let controllers = initialize(&mut document, &default_bindings(), &config.column_kinds);
        let title = document.title.clone();
        let ids: Vec<&str> = controllers.iter().map(|c| c.id()).collect();
        debug!("Opened page {title:?} with tables {ids:?}");
        Page {
            kind,
            title,
            controllers,
            search_boxes: document.into_search_boxes(),
            active: 0,
            cursor_row: 0,
            offset_row: 0,
            cursor_header: 0,
        }
    }

    fn controller(&self) -> Option<&TableController> {
        self.controllers.get(self.active)
    }

    fn controller_mut(&mut self) -> Option<&mut TableController> {
        self.controllers.get_mut(self.active)
    }

    fn search_box(&self) -> Option<&SearchBox> {
        let id = self.controller()?.search_box()?;
        self.search_boxes.iter().find(|b| b.id == id)
    }

    /// Sets the text of a search box and filters every table bound to it.
    fn type_into_search_box(&mut self, id: &str, text: &str) {
        if let Some(search_box) = self.search_boxes.iter_mut().find(|b| b.id == id) {
            search_box.value = text.to_string();
        }
        for controller in self
            .controllers
            .iter_mut()
            .filter(|c| c.search_box() == Some(id))
        {
            controller.filter(text);
        }
        self.cursor_row = 0;
        self.offset_row = 0;
    }

    fn visible_count(&self) -> usize {
        self.controller().map(|c| c.visible_count()).unwrap_or(0)
    }

    fn header_count(&self) -> usize {
        self.controller().map(|c| c.headers().len()).unwrap_or(0)
    }

    fn selected_link(&self) -> Option<String> {
        self.controller()?
            .visible_rows()
            .nth(self.cursor_row)
            .and_then(|r| r.link.clone())
    }

    fn scroll_to_cursor(&mut self, height: usize) {
        let height = height.max(1);
        self.cursor_row = self.cursor_row.min(self.visible_count().saturating_sub(1));
        if self.cursor_row < self.offset_row {
            self.offset_row = self.cursor_row;
        } else if self.cursor_row >= self.offset_row + height {
            self.offset_row = self.cursor_row + 1 - height;
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeaderView {
    pub title: String,
    pub active: bool,
    pub direction: Option<SortDirection>,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct RowView {
    pub cells: Vec<String>,
    pub stripe: Option<Stripe>,
}

pub struct UIData {
    pub name: String,
    pub depth: usize,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>, // Visible rows inside the scroll window
    pub selected_row: usize,
    pub abs_selected_row: usize,
    pub nrows_visible: usize,
    pub nrows_total: usize,
    pub search_box: Option<(String, String)>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            depth: 0,
            headers: Vec::new(),
            rows: Vec::new(),
            selected_row: 0,
            abs_selected_row: 0,
            nrows_visible: 0,
            nrows_total: 0,
            search_box: None,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: Config,
    catalog: Catalog,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    pages: Vec<Page>,
    table_height: usize,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    status_message: String,
    uidata: UIData,
}

impl Model {
    pub fn init(config: &Config, catalog: Catalog, ui_height: usize) -> Result<Self, SongError> {
        let home = Page::open(PageKind::Home, catalog.home_document(), config);
        let mut model = Self {
            config: config.clone(),
            catalog,
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            pages: vec![home],
            table_height: ui_height.saturating_sub(CHROME_HEIGHT),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            status_message: String::new(),
            uidata: UIData::empty(),
        };
        model.set_status_message(format!(
            "Loaded {} songs from {}, press ? for help",
            model.catalog.songs().len(),
            model.catalog.name()
        ));
        if let Some(name) = model.config.start_category.clone() {
            model.open_category(&name);
        }
        model.update_uidata();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), SongError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(1),
                    Message::MoveUp => self.move_selection_up(1),
                    Message::MovePageDown => self.move_selection_down(self.table_height.max(1)),
                    Message::MovePageUp => self.move_selection_up(self.table_height.max(1)),
                    Message::MoveBeginning => self.move_selection_up(usize::MAX),
                    Message::MoveEnd => self.move_selection_down(usize::MAX),
                    Message::MoveLeft => self.move_header_selection(false),
                    Message::MoveRight => self.move_header_selection(true),
                    Message::Sort => {
                        let idx = self.page().cursor_header;
                        self.sort_column(idx)
                    }
                    Message::SortColumn(idx) => self.sort_column(idx),
                    Message::Search => self.enter_search(),
                    Message::Category => self.enter_cmd_mode(CMDMode::Category, ""),
                    Message::Enter => self.enter(),
                    Message::Exit => self.exit(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        self.update_uidata();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn page(&self) -> &Page {
        // The home page is never popped
        &self.pages[self.pages.len() - 1]
    }

    fn page_mut(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        debug!("Status: {}", self.status_message);
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! w:{} h:{}", width, height);
        self.table_height = height.saturating_sub(CHROME_HEIGHT);
        let table_height = self.table_height;
        self.page_mut().scroll_to_cursor(table_height);
    }

    fn move_selection_down(&mut self, size: usize) {
        let table_height = self.table_height;
        let page = self.page_mut();
        page.cursor_row = page.cursor_row.saturating_add(size);
        page.scroll_to_cursor(table_height);
    }

    fn move_selection_up(&mut self, size: usize) {
        let table_height = self.table_height;
        let page = self.page_mut();
        page.cursor_row = page.cursor_row.saturating_sub(size);
        page.scroll_to_cursor(table_height);
    }

    fn move_header_selection(&mut self, right: bool) {
        let page = self.page_mut();
        let count = page.header_count();
        if count == 0 {
            return;
        }
        page.cursor_header = if right {
            (page.cursor_header + 1).min(count - 1)
        } else {
            page.cursor_header.saturating_sub(1)
        };
    }

    fn sort_column(&mut self, idx: usize) {
        let page = self.page_mut();
        let Some(controller) = page.controller_mut() else {
            return;
        };
        if idx >= controller.headers().len() {
            return;
        }
        let direction = controller.click_header_at(idx);
        let title = controller.headers()[idx].title.clone();
        page.cursor_header = idx;
        let order = match direction {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        };
        self.set_status_message(format!("Sorted by {title} {order}"));
    }

    fn enter_search(&mut self) {
        match self.page().search_box().map(|b| b.value.clone()) {
            Some(value) => self.enter_cmd_mode(CMDMode::Search, &value),
            None => self.set_status_message("No search box on this page"),
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode, initial: &str) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.set(initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);

        // Every key stroke in the search box filters right away.
        if self.cmd_mode == Some(CMDMode::Search) && self.last_input.changed {
            let text = self.last_input.input.clone();
            let page = self.page_mut();
            if let Some(id) = page.search_box().map(|b| b.id.clone()) {
                page.type_into_search_box(&id, &text);
            }
            let page = self.page();
            let visible = page.visible_count();
            let total = page.controller().map(|c| c.rows().len()).unwrap_or(0);
            self.set_status_message(format!("{visible} of {total} rows match"));
        }

        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input.input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode.take() {
            Some(CMDMode::Search) => {}
            Some(CMDMode::Category) => {
                if !self.last_input.canceled {
                    self.open_category(&cmd_input);
                }
            }
            None => info!("Cmd mode is none!"),
        }
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn open_category(&mut self, name: &str) {
        match Category::from_name(name) {
            Some(category) => {
                let document = self.catalog.category_document(category);
                let page = Page::open(PageKind::Category(category), document, &self.config);
                self.pages.push(page);
                self.set_status_message(format!(
                    "{} values, Enter shows their songs",
                    self.page().visible_count()
                ));
            }
            None => {
                let known: Vec<&str> = self.catalog.categories().iter().map(|c| c.name()).collect();
                self.set_status_message(format!(
                    "Unknown category '{}', use one of: {}",
                    name.trim(),
                    known.join(", ")
                ));
            }
        }
    }

    fn enter(&mut self) {
        let PageKind::Category(category) = self.page().kind else {
            return;
        };
        let Some(value) = self.page().selected_link() else {
            return;
        };
        match self.catalog.subcategory_document(category, &value) {
            Ok(document) => {
                let kind = PageKind::Subcategory(category, value);
                let page = Page::open(kind, document, &self.config);
                self.pages.push(page);
                self.set_status_message(format!("{} songs", self.page().visible_count()));
            }
            Err(e) => self.set_status_message(format!("Can not open {value:?}: {e}")),
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                // The home page is the bottom of the stack, there is only quit from it
                if self.pages.len() > 1 {
                    let kind = self.pages.pop().map(|p| p.kind);
                    trace!("Leaving page {:?}", kind);
                    let message = match kind {
                        Some(PageKind::Subcategory(category, value)) => {
                            format!("Back from {} {}", category.name(), value)
                        }
                        _ => self.page().title.clone(),
                    };
                    self.set_status_message(message);
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn update_uidata(&mut self) {
        let table_height = self.table_height;
        let page = self.page();
        let mut uidata = UIData::empty();
        uidata.name = page.title.clone();
        uidata.depth = self.pages.len();
        uidata.search_box = page.search_box().map(|b| (b.id.clone(), b.value.clone()));

        if let Some(controller) = page.controller() {
            uidata.headers = controller
                .headers()
                .iter()
                .enumerate()
                .map(|(idx, h)| HeaderView {
                    title: h.title.clone(),
                    active: h.active,
                    direction: h.direction,
                    selected: idx == page.cursor_header,
                })
                .collect();
            uidata.rows = controller
                .visible_rows()
                .skip(page.offset_row)
                .take(table_height.max(1))
                .map(|row| RowView {
                    cells: controller
                        .headers()
                        .iter()
                        .map(|h| row.cell(&h.column).unwrap_or("").to_string())
                        .collect(),
                    stripe: row.stripe,
                })
                .collect();
            uidata.nrows_visible = controller.visible_count();
            uidata.nrows_total = controller.rows().len();
        }
        uidata.selected_row = page.cursor_row.saturating_sub(page.offset_row);
        uidata.abs_selected_row = page.cursor_row;

        uidata.show_popup = self.modus == Modus::POPUP;
        if uidata.show_popup {
            uidata.popup_message = HELP_TEXT.to_string();
        }
        uidata.active_cmdinput = self.modus == Modus::CMDINPUT;
        uidata.cmdinput = self.last_input.clone();
        uidata.cmd_mode = self.cmd_mode;
        uidata.status_message = self.status_message.clone();
        self.uidata = uidata;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{HeaderCell, Row, TableElement};
    use crate::table::{SEARCH_BOX_ALL, SONGS_TABLE_ALL, STATS_TABLE};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::path::PathBuf;

    fn model() -> Model {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/songs_01.csv");
        let catalog = match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => panic!("fixture failed to load: {e:?}"),
        };
        match Model::init(&Config::default(), catalog, 30) {
            Ok(model) => model,
            Err(e) => panic!("{e:?}"),
        }
    }

    fn send(model: &mut Model, msg: Message) {
        if let Err(e) = model.update(Some(msg)) {
            panic!("{e:?}");
        }
    }

    fn type_keys(model: &mut Model, text: &str) {
        for c in text.chars() {
            send(model, Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
    }

    fn press(model: &mut Model, code: KeyCode) {
        send(model, Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn column(model: &Model, idx: usize) -> Vec<String> {
        model
            .get_uidata()
            .rows
            .iter()
            .map(|r| r.cells[idx].clone())
            .collect()
    }

    #[test]
    fn home_shows_all_songs_in_default_order() {
        let m = model();
        let ui = m.get_uidata();
        assert_eq!(ui.nrows_total, 5);
        assert_eq!(ui.headers[1].title, "Main Artist");
        assert_eq!(column(&m, 1), vec!["Adele", "Beyoncé", "Café Tacvba", "Daft Punk", "Queen"]);
        assert_eq!(ui.search_box, Some((SEARCH_BOX_ALL.to_string(), String::new())));
        assert_eq!(ui.status_message, "Loaded 5 songs from songs_01.csv, press ? for help");
    }

    #[test]
    fn search_filters_live_and_escape_clears() {
        let mut m = model();
        send(&mut m, Message::Search);
        assert!(m.raw_keyevents());
        type_keys(&mut m, "CAFÉ");
        assert_eq!(column(&m, 1), vec!["Café Tacvba"]);
        assert_eq!(m.get_uidata().rows[0].stripe, Some(Stripe::Even));

        press(&mut m, KeyCode::Enter);
        assert!(!m.raw_keyevents());
        assert_eq!(m.get_uidata().nrows_visible, 1);

        // Re-entering keeps the text, escape clears it
        send(&mut m, Message::Search);
        assert_eq!(m.get_uidata().cmdinput.input, "CAFÉ");
        press(&mut m, KeyCode::Esc);
        assert_eq!(m.get_uidata().nrows_visible, 5);
    }

    #[test]
    fn header_sort_by_number_keys() {
        let mut m = model();
        send(&mut m, Message::SortColumn(5));
        assert_eq!(column(&m, 5), vec!["116", "80", "79", "76", "72"]);
        send(&mut m, Message::SortColumn(5));
        assert_eq!(column(&m, 5), vec!["72", "76", "79", "80", "116"]);
        let active: Vec<&str> = m
            .get_uidata()
            .headers
            .iter()
            .filter(|h| h.active)
            .map(|h| h.title.as_str())
            .collect();
        assert_eq!(active, vec!["BPM"]);

        send(&mut m, Message::SortColumn(3));
        assert_eq!(column(&m, 3), vec!["6:09", "5:55", "4:55", "4:35", "4:21"]);
        assert_eq!(m.get_uidata().headers[5].direction, None);
    }

    #[test]
    fn category_drill_down_and_back() {
        let mut m = model();
        send(&mut m, Message::Category);
        type_keys(&mut m, "genre");
        press(&mut m, KeyCode::Enter);
        assert_eq!(m.get_uidata().name, "Category: Genre");
        assert_eq!(column(&m, 0), vec!["Disco", "Funk", "Pop", "R&B", "Rock"]);

        send(&mut m, Message::MoveDown);
        send(&mut m, Message::MoveDown);
        send(&mut m, Message::Enter);
        assert_eq!(m.get_uidata().name, "Genre: pop");
        assert_eq!(m.get_uidata().depth, 3);
        assert_eq!(column(&m, 0), vec!["Hello", "Halo"]);

        send(&mut m, Message::Exit);
        assert_eq!(m.get_uidata().depth, 2);
        assert_eq!(m.get_uidata().status_message, "Back from Genre pop");
        send(&mut m, Message::Exit);
        assert_eq!(m.get_uidata().depth, 1);
        assert_eq!(m.get_uidata().status_message, m.get_uidata().name);
        send(&mut m, Message::Exit);
        assert_eq!(m.get_uidata().depth, 1);
    }

    #[test]
    fn unknown_category_keeps_page() {
        let mut m = model();
        send(&mut m, Message::Category);
        type_keys(&mut m, "mood");
        press(&mut m, KeyCode::Enter);
        assert_eq!(m.get_uidata().depth, 1);
        assert!(m.get_uidata().status_message.starts_with("Unknown category 'mood'"));
    }

    #[test]
    fn cursor_stays_on_visible_rows() {
        let mut m = model();
        send(&mut m, Message::MoveEnd);
        assert_eq!(m.get_uidata().abs_selected_row, 4);
        send(&mut m, Message::Search);
        type_keys(&mut m, "queen");
        assert_eq!(m.get_uidata().abs_selected_row, 0);
        press(&mut m, KeyCode::Enter);
        send(&mut m, Message::MoveDown);
        assert_eq!(m.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn shared_search_box_filters_every_bound_table() {
        let rows = |names: &[&str]| -> Vec<Row> {
            names
                .iter()
                .map(|n| Row::new(vec![("Value", *n)]).with_search_key(n.to_lowercase()))
                .collect()
        };
        let document = Document::new("shared")
            .with_table(TableElement::new(
                SONGS_TABLE_ALL,
                vec![HeaderCell::sortable("Value")],
                rows(&["Rock", "Pop"]),
            ))
            .with_table(TableElement::new(
                STATS_TABLE,
                vec![HeaderCell::sortable("Value")],
                rows(&["Rockabilly", "Jazz"]),
            ))
            .with_search_box(SEARCH_BOX_ALL);
        let mut page = Page::open(PageKind::Home, document, &Config::default());
        assert_eq!(page.controllers.len(), 2);

        page.type_into_search_box(SEARCH_BOX_ALL, "rock");
        let visible: Vec<usize> = page.controllers.iter().map(|c| c.visible_count()).collect();
        assert_eq!(visible, vec![1, 1]);
        assert_eq!(page.search_box().map(|b| b.value.as_str()), Some("rock"));
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model();
        send(&mut m, Message::Help);
        assert!(m.get_uidata().show_popup);
        send(&mut m, Message::Exit);
        assert!(!m.get_uidata().show_popup);
        send(&mut m, Message::Quit);
        assert_eq!(m.status, Status::QUITTING);
    }
}
