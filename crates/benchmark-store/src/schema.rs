//! SQLite schema for benchmark persistence.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_records (
    id TEXT PRIMARY KEY,
    model_name TEXT NOT NULL,
    quantization TEXT NOT NULL,
    prompt TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    source TEXT NOT NULL,
    status TEXT NOT NULL,

    avg_cpu_usage REAL,
    avg_memory_usage REAL,
    avg_power_watts REAL,
    peak_memory_gb REAL,
    total_energy_wh REAL,
    duration_seconds REAL,
    tokens_generated INTEGER,
    tokens_per_second REAL,
    prompt_tokens INTEGER,
    total_tokens INTEGER,

    char_count INTEGER,
    word_count INTEGER,
    unique_words INTEGER,
    unique_word_ratio REAL,
    avg_word_length REAL,
    sentence_count INTEGER,
    quality_score REAL,

    response_text TEXT,
    response_preview TEXT,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_benchmark_timestamp
    ON benchmark_records(timestamp DESC);

CREATE INDEX IF NOT EXISTS idx_benchmark_model
    ON benchmark_records(model_name);
"#;
