// Post Curator Constants

// Image discovery
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

// Selection policy defaults
pub const DEFAULT_THRESHOLD: f64 = 7.0;
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_MIN_SELECTION: usize = 6;

// Circuit breaker: consecutive batch failures before scoring halts for a folder
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

// Sentinel owner name for posts ingestion could not attribute
pub const UNKNOWN_MODEL: &str = "Unknown";

// Paths
pub const DATA_FOLDER: &str = "data";
pub const INCOMING_FOLDER: &str = "incoming";
pub const CURATED_FOLDER: &str = "curated";
pub const DB_FILENAME: &str = "imports.db";

// Thumbnail bounds for scoring requests
pub const THUMB_MAX_DIM: u32 = 512;
pub const THUMB_JPEG_QUALITY: u8 = 60;

// Vision backend
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
