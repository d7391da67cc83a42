//! Application-wide constants
//!
//! Upstream endpoints, retry defaults and the fixed German phrasings live here
//! so that providers stay small.

use std::time::Duration;

/// HTTP fetch defaults
pub mod fetch {
    use super::*;

    /// Browser user agent, several sources refuse obvious bots
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:103.0) Gecko/20100101 Firefox/103.0";

    /// Retries after the first attempt
    pub const MAX_RETRIES: u32 = 3;

    /// Linear backoff step, attempt `n` sleeps `n * BACKOFF`
    pub const BACKOFF: Duration = Duration::from_secs(5);

    pub const TIMEOUT: Duration = Duration::from_secs(30);
}

/// Provider endpoints
pub mod endpoints {
    pub const CNBC_QUOTE: &str =
        "https://quote.cnbc.com/quote-html-webservice/restQuote/symbolType/symbol";
    pub const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";
    pub const INVESTINY_HOST: &str = "https://tvc6.investing.com";
    pub const INVESTINY_REFERER: &str = "https://tvc-invdn-com.investing.com/";
    pub const LETF_OVERVIEW: &str = "https://ed8boq.deta.dev/v1/overview/";
    pub const YAHOO_CHART: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";
    pub const WETTER_COM: &str = "https://www.wetter.com/deutschland/dachsenhausen/DE0001902.html";
}

/// Fixed phrasings and template keys
pub mod prose {
    pub const VERB_PLURAL: &str = "sind";
    pub const VERB_SINGULAR: &str = "ist";

    /// Stand-in for values an error line cannot know
    pub const PLACEHOLDER: &str = "n/a";

    pub const ERROR_LINE: &str = "error";
    pub const WEATHER_LINE: &str = "weather";
    pub const CLOSED_SUFFIX: &str = "_closed";

    pub const CONJUNCTION: &str = " und ";
    pub const CROSS_CONJUNCTION: &str = " & ";
    pub const NO_CROSS: &str = "keine ✝️igung";

    pub const DOCUMENT_TEMPLATE: &str = "Guten Morgen zusammen, hier die heutige MSWettervorhersage:\n\n\
        {prose_lines}\n\
        {weather}\n\n\
        Und natürlich die Miesmuschel: !mm Wird heute ein grüner Tag?\n\n";
}

/// Forum posting defaults
pub mod forum {
    pub const SUBREDDIT: &str = "carbonarastrasse";
    pub const HOT_LIMIT: u32 = 3;
    pub const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
    pub const API_BASE: &str = "https://oauth.reddit.com";
    /// chrono format of the date in the daily discussion thread title
    pub const THREAD_DATE_FORMAT: &str = "%B %d, %Y";
    pub const SIGNATURE: &str = "\n\n*^^Dieser ^^Wetterbericht [^^wurde ^^automatisiert ^^erstellt]\
        (https://github.com/m3adow/mswetterbericht) ^^und ^^ist ^^ohne ^^Unterschrift ^^gültig.*";
}
