//! Fixed strings that appear in state fields

use olimpia_prompt::Language;

/// Placeholders, table headers and fallback reasons of one language
#[derive(Debug)]
pub struct Labels {
    pub no_summary: &'static str,
    pub no_news: &'static str,
    pub metrics_unavailable: &'static str,
    pub price: &'static str,
    pub low_52w: &'static str,
    pub high_52w: &'static str,
    pub dividend_yield: &'static str,
    pub change_12m: &'static str,
    pub reason_mock: &'static str,
    pub reason_exhausted: &'static str,
    pub reason_failed: &'static str,
}

pub static ENGLISH: Labels = Labels {
    no_summary: "No data.",
    no_news: "No relevant news found.",
    metrics_unavailable: "Data unavailable",
    price: "CURRENT PRICE",
    low_52w: "52W LOW",
    high_52w: "52W HIGH",
    dividend_yield: "DIV. YIELD",
    change_12m: "12M CHANGE",
    reason_mock: "Mock Mode",
    reason_exhausted: "Fallback (all keys exhausted)",
    reason_failed: "Fallback (generation failed)",
};

pub static PORTUGUESE: Labels = Labels {
    no_summary: "Sem dados.",
    no_news: "Nenhuma notícia relevante encontrada.",
    metrics_unavailable: "Dados Indisponíveis",
    price: "PREÇO ATUAL",
    low_52w: "MIN 52 SEM",
    high_52w: "MAX 52 SEM",
    dividend_yield: "DIV. YIELD",
    change_12m: "VAR. 12M",
    reason_mock: "Modo Mock",
    reason_exhausted: "Fallback (Todas as chaves esgotadas)",
    reason_failed: "Fallback (Falha na geração)",
};

impl Labels {
    /// Portuguese for `pt`, English for everything else
    pub fn for_language(lang: &Language) -> &'static Labels {
        match lang {
            Language::Portuguese => &PORTUGUESE,
            _ => &ENGLISH,
        }
    }
}
