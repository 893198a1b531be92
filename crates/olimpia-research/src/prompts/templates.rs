//! Generation prompts and report templates

use olimpia_prompt::{JinjaTemplate, Result};

pub const TICKER: &str = "research.ticker";
pub const CURATION: &str = "research.curation";
pub const REPORT: &str = "research.report";
pub const FALLBACK: &str = "research.fallback";

/// Ask for the primary B3 symbol of a company, nothing else
pub fn ticker_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::bilingual(
        TICKER,
        "What is the main trading code (ticker) of the company '{{ company }}' on the Brazilian stock exchange (B3)? \
         Answer ONLY with the code (e.g. PETR4). If you do not know, answer N/A.",
        "Qual o código de negociação (Ticker) principal da ação da empresa '{{ company }}' na Bolsa do Brasil (B3)? \
         Responda APENAS o código (ex: PETR4). Se não souber, responda N/A.",
    )
}

/// Pick the most relevant validated news items
pub fn curation_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::bilingual(
        CURATION,
        r"You are the Editor-in-Chief of an investment bank.
Select the {{ count }} news items most relevant to an investor in {{ company }} ({{ ticker }}).

RAW NEWS LIST:
{% for c in candidates %}
ID {{ loop.index }}:
Title: {{ c.title }}
Link: {{ c.url }}
Snippet: {{ c.snippet }}
{% endfor %}
INSTRUCTIONS:
1. Ignore repeated, stale or irrelevant items (e.g. customer service, duplicate bills).
2. Prefer financial results, mergers and acquisitions, dividends and analyst coverage.
3. Use only links from the list above, unchanged.
4. Return ONLY {{ count }} items formatted in Markdown.

OUTPUT FORMAT:
* **[Short News Title](Original Link)**
  > Two-line executive summary of the impact on the stock.",
        r"Você é um Editor Chefe de Investment Banking.
Sua tarefa é selecionar as {{ count }} notícias mais relevantes para um investidor sobre: {{ company }} ({{ ticker }}).

LISTA DE NOTÍCIAS BRUTAS:
{% for c in candidates %}
ID {{ loop.index }}:
Titulo: {{ c.title }}
Link: {{ c.url }}
Snippet: {{ c.snippet }}
{% endfor %}
INSTRUÇÕES:
1. Ignore notícias repetidas, velhas ou irrelevantes (ex: 2ª via, atendimento).
2. Priorize: Resultados Financeiros, Fusões, Dividendos, Análises de Mercado.
3. Use apenas links da lista acima, sem alterá-los.
4. Retorne APENAS {{ count }} itens formatados em Markdown.

FORMATO DE SAÍDA:
* **[Título Resumido da Notícia](Link Original)**
  > Resumo executivo de 2 linhas explicando o impacto para a ação.",
    )
}

/// Narrative report request
pub fn report_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::bilingual(
        REPORT,
        r"Senior Investment Banking Analyst. Write an executive report on: {{ company }} ({{ ticker }}).

INPUTS:
[FINANCIAL DASHBOARD]:
{{ stock_data }}

[SUMMARY]:
{{ summary }}

[NEWS]:
{{ news }}

REQUIRED OUTPUT (MARKDOWN):
# 🏛️ Equity Research: {{ company | upper_pt }}

{{ stock_data }}

## 🏢 Corporate Profile
(Write one solid, professional paragraph about the business, aimed at investors.)

## 📰 Recent News
(List the 3 most relevant news items. Use a '>' quote for the summary.)

* **[News Title](Link)**
  > Summary of the impact or relevant fact in the article.

---
*Report generated by AI (Olimpia Agent).*",
        r"Analista Sênior de Investment Banking. Gere um relatório executivo sobre: {{ company }} ({{ ticker }}).

INPUTS:
[DASHBOARD FINANCEIRO]:
{{ stock_data }}

[RESUMO]:
{{ summary }}

[NOTÍCIAS]:
{{ news }}

OUTPUT OBRIGATÓRIO (MARKDOWN):
# 🏛️ Equity Research: {{ company | upper_pt }}

{{ stock_data }}

## 🏢 Perfil Corporativo
(Escreva um parágrafo sólido e profissional sobre o negócio da empresa, focado em investidores).

## 📰 Notícias Recentes
(Liste as 3 notícias mais relevantes. Use Citação '>' para o resumo).

* **[Título da Notícia](Link)**
  > Resumo do impacto ou fato relevante contido na notícia.

---
*Relatório gerado por AI (Olimpia Agent).*",
    )
}

/// Deterministic report assembled from the collected fields
pub fn fallback_report() -> Result<JinjaTemplate> {
    JinjaTemplate::bilingual(
        FALLBACK,
        r"# 🏛️ Equity Research: {{ company | upper_pt }} ({{ ticker }})

{{ stock_data }}

## 🏢 Corporate Profile
{{ summary }}

## 📰 Recent News
{{ news }}

---
*Report generated via {{ reason }} (real collected data)*",
        r"# 🏛️ Equity Research: {{ company | upper_pt }} ({{ ticker }})

{{ stock_data }}

## 🏢 Perfil Corporativo
{{ summary }}

## 📰 Notícias Recentes
{{ news }}

---
*Relatório gerado via {{ reason }} (Dados reais coletados)*",
    )
}
