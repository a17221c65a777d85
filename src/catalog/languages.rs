//! Built-in language tables.
//!
//! These are the tables the bundled providers report as their supported
//! sets, plus the two-language table used when loading fails.

/// Language name → code table understood by the Google Translate endpoint.
pub const GOOGLE_LANGUAGES: &[(&str, &str)] = &[
    ("afrikaans", "af"),
    ("albanian", "sq"),
    ("amharic", "am"),
    ("arabic", "ar"),
    ("armenian", "hy"),
    ("assamese", "as"),
    ("aymara", "ay"),
    ("azerbaijani", "az"),
    ("bambara", "bm"),
    ("basque", "eu"),
    ("belarusian", "be"),
    ("bengali", "bn"),
    ("bhojpuri", "bho"),
    ("bosnian", "bs"),
    ("bulgarian", "bg"),
    ("catalan", "ca"),
    ("cebuano", "ceb"),
    ("chichewa", "ny"),
    ("chinese (simplified)", "zh-CN"),
    ("chinese (traditional)", "zh-TW"),
    ("corsican", "co"),
    ("croatian", "hr"),
    ("czech", "cs"),
    ("danish", "da"),
    ("dhivehi", "dv"),
    ("dogri", "doi"),
    ("dutch", "nl"),
    ("english", "en"),
    ("esperanto", "eo"),
    ("estonian", "et"),
    ("ewe", "ee"),
    ("filipino", "tl"),
    ("finnish", "fi"),
    ("french", "fr"),
    ("frisian", "fy"),
    ("galician", "gl"),
    ("georgian", "ka"),
    ("german", "de"),
    ("greek", "el"),
    ("guarani", "gn"),
    ("gujarati", "gu"),
    ("haitian creole", "ht"),
    ("hausa", "ha"),
    ("hawaiian", "haw"),
    ("hebrew", "iw"),
    ("hindi", "hi"),
    ("hmong", "hmn"),
    ("hungarian", "hu"),
    ("icelandic", "is"),
    ("igbo", "ig"),
    ("ilocano", "ilo"),
    ("indonesian", "id"),
    ("irish", "ga"),
    ("italian", "it"),
    ("japanese", "ja"),
    ("javanese", "jw"),
    ("kannada", "kn"),
    ("kazakh", "kk"),
    ("khmer", "km"),
    ("kinyarwanda", "rw"),
    ("konkani", "gom"),
    ("korean", "ko"),
    ("krio", "kri"),
    ("kurdish (kurmanji)", "ku"),
    ("kurdish (sorani)", "ckb"),
    ("kyrgyz", "ky"),
    ("lao", "lo"),
    ("latin", "la"),
    ("latvian", "lv"),
    ("lingala", "ln"),
    ("lithuanian", "lt"),
    ("luganda", "lg"),
    ("luxembourgish", "lb"),
    ("macedonian", "mk"),
    ("maithili", "mai"),
    ("malagasy", "mg"),
    ("malay", "ms"),
    ("malayalam", "ml"),
    ("maltese", "mt"),
    ("maori", "mi"),
    ("marathi", "mr"),
    ("meiteilon (manipuri)", "mni-Mtei"),
    ("mizo", "lus"),
    ("mongolian", "mn"),
    ("myanmar", "my"),
    ("nepali", "ne"),
    ("norwegian", "no"),
    ("odia (oriya)", "or"),
    ("oromo", "om"),
    ("pashto", "ps"),
    ("persian", "fa"),
    ("polish", "pl"),
    ("portuguese", "pt"),
    ("punjabi", "pa"),
    ("quechua", "qu"),
    ("romanian", "ro"),
    ("russian", "ru"),
    ("samoan", "sm"),
    ("sanskrit", "sa"),
    ("scots gaelic", "gd"),
    ("sepedi", "nso"),
    ("serbian", "sr"),
    ("sesotho", "st"),
    ("shona", "sn"),
    ("sindhi", "sd"),
    ("sinhala", "si"),
    ("slovak", "sk"),
    ("slovenian", "sl"),
    ("somali", "so"),
    ("spanish", "es"),
    ("sundanese", "su"),
    ("swahili", "sw"),
    ("swedish", "sv"),
    ("tajik", "tg"),
    ("tamil", "ta"),
    ("tatar", "tt"),
    ("telugu", "te"),
    ("thai", "th"),
    ("tigrinya", "ti"),
    ("tsonga", "ts"),
    ("turkish", "tr"),
    ("turkmen", "tk"),
    ("twi", "ak"),
    ("ukrainian", "uk"),
    ("urdu", "ur"),
    ("uyghur", "ug"),
    ("uzbek", "uz"),
    ("vietnamese", "vi"),
    ("welsh", "cy"),
    ("xhosa", "xh"),
    ("yiddish", "yi"),
    ("yoruba", "yo"),
    ("zulu", "zu"),
];

/// Language codes the Google TTS endpoint can voice.
pub const GOOGLE_TTS_CODES: &[&str] = &[
    "af", "am", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et",
    "eu", "fi", "fr", "fr-CA", "gl", "gu", "ha", "hi", "hr", "hu", "id", "is", "it", "iw", "ja",
    "jw", "km", "kn", "ko", "la", "lt", "lv", "ml", "mr", "ms", "my", "ne", "nl", "no", "pa",
    "pl", "pt", "pt-PT", "ro", "ru", "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th",
    "tl", "tr", "uk", "ur", "vi", "yue", "zh", "zh-CN", "zh-TW",
];

/// Codes speech recognition is offered for.
///
/// Deliberately smaller than both the translation and the TTS sets.
pub const RECOGNITION_CODES: &[&str] = &[
    "en", "hi", "es", "fr", "de", "it", "pt", "ru", "zh-CN", "ja", "ko",
];

/// Table used when the provider's language list cannot be loaded.
pub const FALLBACK_LANGUAGES: &[(&str, &str)] = &[("english", "en"), ("hindi", "hi")];

/// TTS set used when the provider's TTS list cannot be loaded.
pub const FALLBACK_TTS_CODES: &[&str] = &["en", "hi"];
