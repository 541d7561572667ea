/// Column-name constants for CITES trade exports.
/// Single source of truth - also exported to Python via PyO3.

// ── Source CSV columns ──────────────────────────────────────────────────────
pub mod source {
    pub const YEAR: &str = "Year";
    pub const APPENDIX: &str = "App.";
    pub const ORDER: &str = "Order";
    pub const FAMILY: &str = "Family";
    pub const TAXON: &str = "Taxon";
    pub const TERM: &str = "Term";
    pub const PURPOSE: &str = "Purpose";
    pub const SOURCE: &str = "Source";
    pub const IMPORTER_QUANTITY: &str = "Importer reported quantity";
    pub const EXPORTER_QUANTITY: &str = "Exporter reported quantity";

    pub const REQUIRED: [&str; 10] = [
        YEAR,
        APPENDIX,
        ORDER,
        FAMILY,
        TAXON,
        TERM,
        PURPOSE,
        SOURCE,
        IMPORTER_QUANTITY,
        EXPORTER_QUANTITY,
    ];

    pub const TEXT: [&str; 7] = [APPENDIX, ORDER, FAMILY, TAXON, TERM, PURPOSE, SOURCE];
}

// ── Derived columns (added by enrich) ───────────────────────────────────────
pub mod derived {
    pub const ANIMAL_ORDER: &str = "Animal order";
    pub const PURPOSE_LABEL: &str = "Purpose label";
    pub const QUANTITY: &str = "Quantity";
}

// ── Aggregate output columns ────────────────────────────────────────────────
pub mod aggregate {
    pub const QUANTITY: &str = "Quantity";
    pub const PERCENTAGE: &str = "Percentage";
}

// ── Code values ─────────────────────────────────────────────────────────────
pub mod codes {
    /// Source code for specimens taken from the wild.
    pub const WILD: &str = "W";
    /// Reporting year known to be incomplete in the export.
    pub const INCOMPLETE_YEAR: i64 = 2019;
}
