/// Symbols an identifier is drawn from (lowercase Base32)
pub const ID_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Length of every identifier minted by the stamper
pub const ID_LENGTH: usize = 10;

/// Resample budget for an identifier with an alphabetic first character
pub const ID_MAX_ATTEMPTS: u32 = 100;

pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Raw attribute names. The `xml` prefix is reserved and cannot be rebound.
pub const XML_ID: &[u8] = b"xml:id";
pub const XML_LANG: &[u8] = b"xml:lang";

/// Local name of the TEI sentence element
pub const SENTENCE_TAG: &[u8] = b"s";

/// Document file extension, compared case-insensitively
pub const DOCUMENT_EXTENSION: &str = "xml";

/// Sentences tagged with this language are left out of the dataset
pub const DEFAULT_EXCLUDED_LANG: &str = "da";

pub const DEFAULT_DATASET_FILE: &str = "sentences.jsonl";

pub const REGISTRY_DUMP_FILE: &str = "used_ids.txt";

/// Progress update interval (tick every N documents)
pub const PROGRESS_INTERVAL: u64 = 250;

/// Parliamentary question files, e.g. `52-118-2.xml`
pub const QUESTION_FILE_PATTERN: &str = r"^52-.*-.*\.xml$";

/// Captures the sequential question number of a question file name
pub const QUESTION_NUMBER_PATTERN: &str = r"52-(\d+)-\d+\.xml";

pub const COVERAGE_MARKDOWN_FILE: &str = "PQ_STATS.md";
pub const COVERAGE_JSON_FILE: &str = "PQ_STATS.json";

/// Official yearly totals of §52a questions
pub const SECTION_52A_QUESTION_TOTALS: &[(u32, u32)] = &[
    (2008, 39),
    (2009, 115),
    (2010, 85),
    (2011, 46),
    (2012, 60),
    (2013, 66),
    (2014, 108),
    (2015, 71),
    (2016, 100),
    (2017, 86),
    (2018, 88),
    (2019, 120),
    (2020, 169),
    (2021, 222),
    (2022, 135),
    (2023, 141),
    (2024, 119),
];

/// Characters counted as Faroese diacritics in dataset statistics
pub const FAROESE_DIACRITICS: &str = "áíóúýæøðÁÍÓÚÝÆØÐ";
