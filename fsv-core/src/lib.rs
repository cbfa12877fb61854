pub mod error;
pub use error::{CoreError, CoreResult};

pub mod config;
pub use config::{Config, ConstrainMode, RenderConfig, ViewOptions};

pub mod logging;
pub use logging::{Logger, LoggerConfig, LoggingError};

pub mod cache {
    pub mod entry_cache;
    pub use entry_cache::{CacheStats, EntryCache};
}

pub mod controller {
    pub mod cursor;
    pub use cursor::{CursorTracker, constrain_cursor};

    pub mod pipeline;
    pub use pipeline::{FetchStep, PipelineState, RenderPacer, RenderReport};

    pub mod view_manager;
    pub use view_manager::ViewManager;

    pub mod engine;
    pub use engine::{ListingEngine, RenderOptions, TickOutcome};
}

pub mod fs {
    pub mod adapter;
    pub use adapter::{AdapterError, AdapterRegistry, Continuation, ListPage, ListingAdapter};

    pub mod local_adapter;
    pub use local_adapter::{LOCAL_SCHEME, LocalAdapter, url_for_dir};
}

pub mod model {
    pub mod entry;
    pub use entry::{Entry, EntryId, EntryMeta, EntryRecord, EntryType};

    pub mod hidden;
    pub use hidden::{HiddenFilter, HiddenPredicate, Visibility};

    pub mod sort;
    pub use sort::{Comparator, NameOrder, SortDirection, SortEngine, SortSpec};

    pub mod url;
    pub use url::Url;
}

pub mod util {
    pub mod debounce;
    pub mod warn_once;
}

pub mod view {
    pub mod columns;
    pub use columns::{Chunk, Column, ColumnRegistry, SortKey};

    pub mod format;
    pub use format::{FormattedRow, build_listing, format_entry, format_id, parse_id};

    pub mod listing_view;
    pub use listing_view::{Annotation, Cursor, View, ViewId};

    pub mod parse;
    pub use parse::{ParsedLine, parse_line};

    pub mod table;
    pub use table::{RenderTable, RenderedListing, RenderedRow, StyleSpan};
}

pub use controller::{ListingEngine, RenderOptions};
pub use model::{Entry, EntryType, Url};
