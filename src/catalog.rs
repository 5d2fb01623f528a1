use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::document::{Document, HeaderCell, Row, TableElement};
use crate::domain::SongError;
use crate::search::fold_to_ascii;
use crate::table::{SEARCH_BOX, SEARCH_BOX_ALL, SONGS_TABLE, SONGS_TABLE_ALL, STATS_TABLE};

const MAIN_ARTIST: &str = "Main Artist";
const SONG: &str = "Song";
const FEATURING: &str = "Featuring";
const DURATION: &str = "Duration";
const YEAR_RELEASED: &str = "Year Released";
const BPM: &str = "BPM";
const KEY: &str = "Key";
const GENRE: &str = "Genre";
const LANGUAGE: &str = "Language";
const COUNTRY: &str = "Country";
const ARRANGEMENT: &str = "Arrangement";

const REQUIRED_COLUMNS: [&str; 4] = [MAIN_ARTIST, SONG, YEAR_RELEASED, BPM];
const SONG_COLUMNS: [&str; 11] = [
    MAIN_ARTIST,
    SONG,
    FEATURING,
    DURATION,
    YEAR_RELEASED,
    BPM,
    KEY,
    GENRE,
    LANGUAGE,
    COUNTRY,
    ARRANGEMENT,
];
// Column order of the song tables.
const SONG_TABLE_COLUMNS: [&str; 7] = [
    SONG,
    MAIN_ARTIST,
    FEATURING,
    DURATION,
    YEAR_RELEASED,
    BPM,
    KEY,
];
// Years and bpm beyond this are not numbers a song can have.
const MAX_NUMBER: f64 = 1e15;

pub const STATS_VALUE: &str = "Value";
pub const STATS_COUNT: &str = "Count";

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Key,
    Bpm,
    Genre,
    Language,
    Country,
    YearReleased,
    Arrangement,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Key,
        Category::Bpm,
        Category::Genre,
        Category::Language,
        Category::Country,
        Category::YearReleased,
        Category::Arrangement,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Key => KEY,
            Category::Bpm => BPM,
            Category::Genre => GENRE,
            Category::Language => LANGUAGE,
            Category::Country => COUNTRY,
            Category::YearReleased => YEAR_RELEASED,
            Category::Arrangement => ARRANGEMENT,
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        let name = name.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Folded {
    main_artist: String,
    song: String,
    featuring: String,
    key: String,
    genre: Vec<String>,
    language: Vec<String>,
    country: Vec<String>,
    arrangement: Vec<String>,
}

/// One preprocessed record of the songs file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Song {
    pub main_artist: String,
    pub song: String,
    pub featuring: String,
    pub duration: String,
    pub year_released: i64,
    pub bpm: i64,
    pub key: String,
    pub genre: Vec<String>,
    pub language: Vec<String>,
    pub country: Vec<String>,
    pub arrangement: Vec<String>,
    folded: Folded,
}

impl Song {
    pub fn bpm_range(&self) -> i64 {
        self.bpm.div_euclid(10) * 10
    }

    pub fn year_range(&self) -> i64 {
        self.year_released.div_euclid(10) * 10
    }

    /// Folded artist, title, featuring and key joined by spaces.
    pub fn search_key(&self) -> String {
        [
            self.folded.main_artist.as_str(),
            self.folded.song.as_str(),
            self.folded.featuring.as_str(),
            self.folded.key.as_str(),
        ]
        .join(" ")
    }

    // (original, folded) values of a multi valued category.
    fn multi_values(&self, category: Category) -> Option<(&[String], &[String])> {
        match category {
            Category::Genre => Some((&self.genre, &self.folded.genre)),
            Category::Language => Some((&self.language, &self.folded.language)),
            Category::Country => Some((&self.country, &self.folded.country)),
            Category::Arrangement => Some((&self.arrangement, &self.folded.arrangement)),
            _ => None,
        }
    }

    fn to_row(&self) -> Row {
        let year = self.year_released.to_string();
        let bpm = self.bpm.to_string();
        let cells = SONG_TABLE_COLUMNS
            .iter()
            .map(|&column| {
                let text = match column {
                    SONG => self.song.as_str(),
                    MAIN_ARTIST => self.main_artist.as_str(),
                    FEATURING => self.featuring.as_str(),
                    DURATION => self.duration.as_str(),
                    YEAR_RELEASED => year.as_str(),
                    BPM => bpm.as_str(),
                    _ => self.key.as_str(),
                };
                (column, text.to_string())
            })
            .collect();
        Row::new(cells).with_search_key(self.search_key())
    }
}

/// A value of a category with the number of songs carrying it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryValue {
    pub key: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct Catalog {
    name: String,
    songs: Vec<Song>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, songs: Vec<Song>) -> Self {
        Catalog {
            name: name.into(),
            songs,
        }
    }

    pub fn load(path: PathBuf) -> Result<Self, SongError> {
        let file_type = Self::check_file(&path)?;
        let frame = match file_type {
            FileType::CSV => Self::load_csv(&path)?,
            FileType::PARQUET => Self::load_parquet(&path)?,
            FileType::ARROW => Self::load_arrow(&path)?,
        };

        let start_time = Instant::now();
        let df = frame.collect()?;
        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(SongError::MissingColumn(name.to_string()));
            }
        }

        // Each column is cast and copied out of the frame in its own thread.
        let columns: Result<HashMap<&str, Vec<Option<String>>>, PolarsError> = SONG_COLUMNS
            .par_iter()
            .map(|&name| Self::load_column(&df, name).map(|data| (name, data)))
            .collect();
        let columns = columns?;

        let songs: Vec<Song> = (0..df.height())
            .into_par_iter()
            .filter_map(|idx| Self::preprocess(&columns, idx))
            .collect();

        info!(
            "Loaded {} of {} songs from {:?} in {}ms",
            songs.len(),
            df.height(),
            path,
            start_time.elapsed().as_millis()
        );

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Ok(Catalog::new(name, songs))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    fn check_file(path: &Path) -> Result<FileType, SongError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SongError::FileNotFound,
            ErrorKind::PermissionDenied => SongError::PermissionDenied,
            _ => SongError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(SongError::LoadingFailed("Not a file!".into()));
        }
        debug!("Opening {:?} ({} bytes)", path, metadata.len());
        Self::detect_file_type(path)
    }

    fn detect_file_type(path: &Path) -> Result<FileType, SongError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(SongError::UnknownFileType),
        }
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }

    // Optional columns that are not in the file read as all missing.
    fn load_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PolarsError> {
        let Ok(column) = df.column(name) else {
            trace!("Column {name:?} not present, using empty values");
            return Ok(vec![None; df.height()]);
        };
        let column = column.cast(&DataType::String)?;
        let series = column.str()?;
        Ok(series
            .into_iter()
            .map(|value| value.map(|s| s.to_string()))
            .collect())
    }

    // Builds a song from row `idx`. Rows without a numeric year or bpm are dropped.
    fn preprocess(columns: &HashMap<&str, Vec<Option<String>>>, idx: usize) -> Option<Song> {
        let text = |name: &str| -> String {
            columns
                .get(name)
                .and_then(|data| data[idx].as_deref())
                .map(str::to_string)
                .unwrap_or_default()
        };
        let number = |name: &str| -> Option<i64> {
            let value = text(name).trim().parse::<f64>().ok()?;
            (value.abs() < MAX_NUMBER).then_some(value as i64)
        };
        let list = |name: &str| -> Vec<String> {
            let value = text(name);
            if value.is_empty() {
                Vec::new()
            } else {
                value.split(',').map(|s| s.trim().to_string()).collect()
            }
        };
        let fold_all = |items: &[String]| -> Vec<String> {
            items.iter().map(|s| fold_to_ascii(s)).collect()
        };

        let Some(year_released) = number(YEAR_RELEASED) else {
            trace!("Dropping row {idx}: invalid {YEAR_RELEASED}");
            return None;
        };
        let Some(bpm) = number(BPM) else {
            trace!("Dropping row {idx}: invalid {BPM}");
            return None;
        };

        let main_artist = text(MAIN_ARTIST);
        let song = text(SONG);
        let featuring = text(FEATURING).trim().to_string();
        let key = text(KEY);
        let genre = list(GENRE);
        let language = list(LANGUAGE);
        let country = list(COUNTRY);
        let arrangement = list(ARRANGEMENT);

        let folded = Folded {
            main_artist: fold_to_ascii(&main_artist),
            song: fold_to_ascii(&song),
            featuring: fold_to_ascii(&featuring),
            key: fold_to_ascii(&key),
            genre: fold_all(&genre),
            language: fold_all(&language),
            country: fold_all(&country),
            arrangement: fold_all(&arrangement),
        };

        Some(Song {
            main_artist,
            song,
            featuring,
            duration: text(DURATION),
            year_released,
            bpm,
            key,
            genre,
            language,
            country,
            arrangement,
            folded,
        })
    }

    /// Distinct values of `category` with their song counts.
    pub fn category_values(&self, category: Category) -> Vec<CategoryValue> {
        match category {
            Category::Bpm => Self::range_values(self.songs.iter().map(Song::bpm_range)),
            Category::YearReleased => Self::range_values(self.songs.iter().map(Song::year_range)),
            Category::Key => self.single_values(),
            _ => self.multi_values(category),
        }
    }

    fn range_values(ranges: impl Iterator<Item = i64>) -> Vec<CategoryValue> {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for range in ranges {
            *counts.entry(range).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(range, count)| CategoryValue {
                key: range.to_string(),
                label: format!("{}-{}", range, range.saturating_add(9)),
                count,
            })
            .collect()
    }

    fn single_values(&self) -> Vec<CategoryValue> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for song in &self.songs {
            let pair = (song.folded.key.as_str(), song.key.as_str());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        let mut values: Vec<CategoryValue> = pairs
            .into_iter()
            .map(|(folded, original)| CategoryValue {
                key: folded.to_string(),
                label: original.to_string(),
                count: self.songs.iter().filter(|s| s.folded.key == folded).count(),
            })
            .collect();
        values.sort_by(|a, b| a.label.cmp(&b.label));
        values
    }

    fn multi_values(&self, category: Category) -> Vec<CategoryValue> {
        let mut values: Vec<CategoryValue> = Vec::new();
        let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
        let songs = self.songs.iter().filter_map(|s| s.multi_values(category));
        for (originals, folded_items) in songs {
            for (original, folded) in originals.iter().zip(folded_items.iter()) {
                let pair = (folded.as_str(), original.as_str());
                match positions.get(&pair) {
                    Some(&pos) => values[pos].count += 1,
                    None => {
                        positions.insert(pair, values.len());
                        values.push(CategoryValue {
                            key: folded.clone(),
                            label: original.clone(),
                            count: 1,
                        });
                    }
                }
            }
        }
        values.sort_by(|a, b| a.label.cmp(&b.label));
        values
    }

    /// Songs carrying `value` in `category`. Range categories take the lower
    /// bound of the range ("110" for 110-119).
    pub fn songs_in(&self, category: Category, value: &str) -> Result<Vec<&Song>, SongError> {
        let value = value.to_lowercase().trim().to_string();
        let songs = match category {
            Category::Bpm | Category::YearReleased => {
                let range = value.parse::<i64>().map_err(|_| {
                    SongError::InvalidValue(format!("{} is not a {} range", value, category.name()))
                })?;
                self.songs
                    .iter()
                    .filter(|s| {
                        if category == Category::Bpm {
                            s.bpm_range() == range
                        } else {
                            s.year_range() == range
                        }
                    })
                    .collect()
            }
            Category::Key => self.songs.iter().filter(|s| s.folded.key == value).collect(),
            _ => self
                .songs
                .iter()
                .filter(|s| {
                    s.multi_values(category)
                        .is_some_and(|(_, folded)| folded.contains(&value))
                })
                .collect(),
        };
        Ok(songs)
    }

    fn songs_table<'a>(id: &str, songs: impl Iterator<Item = &'a Song>) -> TableElement {
        let headers = SONG_TABLE_COLUMNS
            .iter()
            .map(|&column| HeaderCell::sortable(column))
            .collect();
        TableElement::new(id, headers, songs.map(Song::to_row).collect())
    }

    /// Page with every song.
    pub fn home_document(&self) -> Document {
        Document::new(format!("All songs [{}]", self.name))
            .with_table(Self::songs_table(SONGS_TABLE_ALL, self.songs.iter()))
            .with_search_box(SEARCH_BOX_ALL)
    }

    /// Page with the values of a category and how many songs each has.
    pub fn category_document(&self, category: Category) -> Document {
        let rows = self
            .category_values(category)
            .into_iter()
            .map(|value| {
                Row::new(vec![
                    (STATS_VALUE, value.label.clone()),
                    (STATS_COUNT, value.count.to_string()),
                ])
                .with_search_key(fold_to_ascii(&value.label))
                .with_link(value.key)
            })
            .collect();
        let table = TableElement::new(
            STATS_TABLE,
            vec![HeaderCell::sortable(STATS_VALUE), HeaderCell::sortable(STATS_COUNT)],
            rows,
        );
        Document::new(format!("Category: {}", category.name()))
            .with_table(table)
            .with_search_box(SEARCH_BOX_ALL)
    }

    /// Page with the songs of one category value.
    pub fn subcategory_document(
        &self,
        category: Category,
        value: &str,
    ) -> Result<Document, SongError> {
        let songs = self.songs_in(category, value)?;
        Ok(Document::new(format!("{}: {}", category.name(), value))
            .with_table(Self::songs_table(SONGS_TABLE, songs.into_iter()))
            .with_search_box(SEARCH_BOX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorter::ColumnKinds;
    use crate::table::{default_bindings, initialize};

    fn load_fixture(name: &str) -> Catalog {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name);
        match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => panic!("fixture {name} failed to load: {e:?}"),
        }
    }

    fn fixture() -> Catalog {
        load_fixture("songs_01.csv")
    }

    fn labels(values: &[CategoryValue]) -> Vec<(&str, usize)> {
        values.iter().map(|v| (v.label.as_str(), v.count)).collect()
    }

    #[test]
    fn rows_with_invalid_numbers_are_dropped() {
        let catalog = fixture();
        let artists: Vec<&str> = catalog.songs().iter().map(|s| s.main_artist.as_str()).collect();
        assert_eq!(artists, vec!["Beyoncé", "Café Tacvba", "Adele", "Daft Punk", "Queen"]);
        assert_eq!(catalog.name(), "songs_01.csv");
    }

    #[test]
    fn preprocessing_folds_and_splits() {
        let catalog = fixture();
        let halo = &catalog.songs()[0];
        assert_eq!(halo.genre, vec!["Pop", "R&B"]);
        assert_eq!(halo.year_released, 2008);
        assert_eq!(halo.bpm, 80);
        assert_eq!(halo.featuring, "");
        assert_eq!(halo.search_key(), "beyonce halo  a");

        let lucky = &catalog.songs()[3];
        assert_eq!(lucky.search_key(), "daft punk get lucky pharrell williams f#m");
        assert_eq!(lucky.bpm_range(), 110);
    }

    #[test]
    fn range_categories() {
        let catalog = fixture();
        let bpm = catalog.category_values(Category::Bpm);
        assert_eq!(labels(&bpm), vec![("70-79", 3), ("80-89", 1), ("110-119", 1)]);
        assert_eq!(bpm[0].key, "70");

        let years = catalog.category_values(Category::YearReleased);
        assert_eq!(labels(&years), vec![("1970-1979", 1), ("2000-2009", 2), ("2010-2019", 2)]);
    }

    #[test]
    fn out_of_range_numbers_are_dropped() {
        let catalog = load_fixture("songs_02.csv");
        let songs: Vec<&str> = catalog.songs().iter().map(|s| s.song.as_str()).collect();
        assert_eq!(songs, vec!["Fast One", "Old One"]);

        let bpm = catalog.category_values(Category::Bpm);
        assert_eq!(labels(&bpm), vec![("-10--1", 1), ("200-209", 1)]);
        let years = catalog.category_values(Category::YearReleased);
        assert_eq!(labels(&years), vec![("0-9", 1), ("1990-1999", 1)]);
    }

    #[test]
    fn range_labels_saturate() {
        let song = Song {
            bpm: i64::MAX,
            ..Song::default()
        };
        let catalog = Catalog::new("extreme", vec![song]);
        let bpm = catalog.category_values(Category::Bpm);
        assert_eq!(bpm.len(), 1);
        assert_eq!(bpm[0].label, format!("{}-{}", i64::MAX / 10 * 10, i64::MAX));
    }

    #[test]
    fn multi_valued_categories_count_each_item() {
        let catalog = fixture();
        let genres = catalog.category_values(Category::Genre);
        assert_eq!(
            labels(&genres),
            vec![("Disco", 1), ("Funk", 1), ("Pop", 2), ("R&B", 1), ("Rock", 2)]
        );
        assert_eq!(genres[3].key, "r&b");
    }

    #[test]
    fn single_valued_category() {
        let catalog = fixture();
        let keys = catalog.category_values(Category::Key);
        assert_eq!(
            labels(&keys),
            vec![("A", 1), ("Bb", 1), ("D", 1), ("F#m", 1), ("Fm", 1)]
        );
    }

    #[test]
    fn drill_down() {
        let catalog = fixture();
        let titles = |songs: Vec<&Song>| songs.iter().map(|s| s.song.clone()).collect::<Vec<_>>();

        let pop = catalog.songs_in(Category::Genre, " Pop ").map(titles);
        assert_eq!(pop.ok(), Some(vec!["Halo".to_string(), "Hello".to_string()]));

        let slow = catalog.songs_in(Category::Bpm, "70").map(titles);
        assert_eq!(
            slow.ok(),
            Some(vec!["Eres".to_string(), "Hello".to_string(), "Bohemian Rhapsody".to_string()])
        );

        let fm = catalog.songs_in(Category::Key, "fm").map(titles);
        assert_eq!(fm.ok(), Some(vec!["Hello".to_string()]));

        assert!(matches!(
            catalog.songs_in(Category::YearReleased, "nineties"),
            Err(SongError::InvalidValue(_))
        ));
    }

    #[test]
    fn category_names_are_case_insensitive() {
        assert_eq!(Category::from_name("year released"), Some(Category::YearReleased));
        assert_eq!(Category::from_name(" bpm"), Some(Category::Bpm));
        assert_eq!(Category::from_name("mood"), None);
    }

    #[test]
    fn unknown_extension_and_missing_file() {
        assert!(matches!(
            Catalog::load(PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"))),
            Err(SongError::UnknownFileType)
        ));
        assert!(matches!(
            Catalog::load(PathBuf::from("does/not/exist.csv")),
            Err(SongError::FileNotFound)
        ));
    }

    #[test]
    fn documents_initialize_their_table() {
        let catalog = fixture();
        let kinds = ColumnKinds::default();

        let mut home = catalog.home_document();
        let controllers = initialize(&mut home, &default_bindings(), &kinds);
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].id(), SONGS_TABLE_ALL);
        assert_eq!(controllers[0].search_box(), Some(SEARCH_BOX_ALL));
        let first: Vec<&str> = controllers[0]
            .rows()
            .iter()
            .map(|r| r.cell("Main Artist").unwrap_or(""))
            .collect();
        assert_eq!(first, vec!["Adele", "Beyoncé", "Café Tacvba", "Daft Punk", "Queen"]);

        let mut stats = catalog.category_document(Category::Bpm);
        let mut controllers = initialize(&mut stats, &default_bindings(), &kinds);
        let stats = &mut controllers[0];
        assert_eq!(stats.id(), STATS_TABLE);
        stats.click_header(STATS_COUNT);
        let counts: Vec<&str> = stats
            .rows()
            .iter()
            .map(|r| r.cell(STATS_COUNT).unwrap_or(""))
            .collect();
        assert_eq!(counts, vec!["3", "1", "1"]);
        assert_eq!(stats.rows()[0].link.as_deref(), Some("70"));

        let mut sub = match catalog.subcategory_document(Category::Genre, "rock") {
            Ok(doc) => doc,
            Err(e) => panic!("{e:?}"),
        };
        let controllers = initialize(&mut sub, &default_bindings(), &kinds);
        assert_eq!(controllers[0].id(), SONGS_TABLE);
        assert_eq!(controllers[0].search_box(), Some(SEARCH_BOX));
        assert_eq!(controllers[0].rows().len(), 2);
    }
}
