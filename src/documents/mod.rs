/*!
 * # Document rendering
 *
 * Receipts ("kwitansi"), invoices and MoU agreements are rendered from embedded
 * HTML templates with minijinja, then laid out as text on A4 PDF pages.
 */

use minijinja::{Environment, UndefinedBehavior};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::errors::ServiceError;
use crate::storage::UploadFolder;

pub mod pdf;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    Serialize,
    utoipa::ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    Kwitansi,
    Invoice,
    Mou,
}

impl DocumentKind {
    pub fn template_name(self) -> &'static str {
        match self {
            DocumentKind::Kwitansi => "kwitansi.html",
            DocumentKind::Invoice => "invoice.html",
            DocumentKind::Mou => "mou.html",
        }
    }

    pub fn folder(self) -> UploadFolder {
        match self {
            DocumentKind::Kwitansi => UploadFolder::Receipts,
            DocumentKind::Invoice => UploadFolder::Invoices,
            DocumentKind::Mou => UploadFolder::Mou,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Kwitansi => "Kwitansi Pembayaran",
            DocumentKind::Invoice => "Invoice",
            DocumentKind::Mou => "Memorandum of Understanding",
        }
    }
}

/// Holds the compiled templates; cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct DocumentRenderer {
    env: Environment<'static>,
}

impl DocumentRenderer {
    pub fn new() -> Result<Self, ServiceError> {
        let mut env = Environment::new();
        // `{{ customer.name }}` must render empty even when `customer` itself is absent.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        for (name, source) in [
            ("kwitansi.html", include_str!("templates/kwitansi.html")),
            ("invoice.html", include_str!("templates/invoice.html")),
            ("mou.html", include_str!("templates/mou.html")),
        ] {
            env.add_template(name, source)
                .map_err(|e| ServiceError::DocumentError(format!("template {}: {}", name, e)))?;
        }
        Ok(Self { env })
    }

    /// Renders the HTML for a document. Missing context keys render as empty text.
    pub fn render_html<C: Serialize>(
        &self,
        kind: DocumentKind,
        context: &C,
    ) -> Result<String, ServiceError> {
        let template = self
            .env
            .get_template(kind.template_name())
            .map_err(|e| ServiceError::DocumentError(e.to_string()))?;
        template
            .render(context)
            .map_err(|e| ServiceError::DocumentError(format!("render {}: {}", kind, e)))
    }

    /// Renders the HTML and lays it out as a PDF.
    pub fn render_pdf<C: Serialize>(
        &self,
        kind: DocumentKind,
        context: &C,
    ) -> Result<Vec<u8>, ServiceError> {
        let html = self.render_html(kind, context)?;
        pdf::html_to_pdf(kind.title(), &html)
    }
}

/// Formats an amount as Indonesian Rupiah, e.g. `Rp 1.250.000` or `Rp 1.250.000,50`.
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();
    let whole = abs.trunc();
    let cents = ((abs - whole) * Decimal::from(100)).to_u64().unwrap_or(0);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str("Rp ");
    out.push_str(&grouped);
    if cents > 0 {
        out.push_str(&format!(",{:02}", cents));
    }
    out
}

const UNITS: [&str; 12] = [
    "", "satu", "dua", "tiga", "empat", "lima", "enam", "tujuh", "delapan", "sembilan",
    "sepuluh", "sebelas",
];

fn spell(n: u64) -> String {
    let joined = |head: String, rest: u64| {
        if rest == 0 {
            head
        } else {
            format!("{} {}", head, spell(rest))
        }
    };

    match n {
        0..=11 => UNITS[n as usize].to_string(),
        12..=19 => format!("{} belas", UNITS[(n - 10) as usize]),
        20..=99 => joined(format!("{} puluh", UNITS[(n / 10) as usize]), n % 10),
        100..=199 => joined("seratus".to_string(), n - 100),
        200..=999 => joined(format!("{} ratus", UNITS[(n / 100) as usize]), n % 100),
        1_000..=1_999 => joined("seribu".to_string(), n - 1_000),
        2_000..=999_999 => joined(format!("{} ribu", spell(n / 1_000)), n % 1_000),
        1_000_000..=999_999_999 => {
            joined(format!("{} juta", spell(n / 1_000_000)), n % 1_000_000)
        }
        1_000_000_000..=999_999_999_999 => joined(
            format!("{} miliar", spell(n / 1_000_000_000)),
            n % 1_000_000_000,
        ),
        _ => joined(
            format!("{} triliun", spell(n / 1_000_000_000_000)),
            n % 1_000_000_000_000,
        ),
    }
}

/// Spells out a rupiah amount in Indonesian words ("terbilang"). Cents are dropped.
pub fn terbilang(amount: Decimal) -> String {
    let whole = amount.abs().trunc().to_u64().unwrap_or(0);
    let words = if whole == 0 {
        "nol".to_string()
    } else {
        spell(whole)
    };
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => format!("{}{} rupiah", first.to_uppercase(), chars.as_str()),
        None => "Nol rupiah".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), "Rp 0")]
    #[case(dec!(250000), "Rp 250.000")]
    #[case(dec!(1000000), "Rp 1.000.000")]
    #[case(dec!(1250000.5), "Rp 1.250.000,50")]
    #[case(dec!(-75000), "-Rp 75.000")]
    fn rupiah_formatting(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(format_rupiah(amount), expected);
    }

    #[rstest]
    #[case(dec!(0), "Nol rupiah")]
    #[case(dec!(11), "Sebelas rupiah")]
    #[case(dec!(115), "Seratus lima belas rupiah")]
    #[case(dec!(1000), "Seribu rupiah")]
    #[case(dec!(250000), "Dua ratus lima puluh ribu rupiah")]
    #[case(dec!(1000000), "Satu juta rupiah")]
    #[case(dec!(1750500), "Satu juta tujuh ratus lima puluh ribu lima ratus rupiah")]
    fn terbilang_words(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(terbilang(amount), expected);
    }

    #[test]
    fn missing_keys_render_empty_and_values_are_escaped() {
        let renderer = DocumentRenderer::new().unwrap();
        let html = renderer
            .render_html(
                DocumentKind::Invoice,
                &serde_json::json!({
                    "customer": { "name": "<b>Rina</b>" },
                    "payments": [
                        { "sequence": 1, "type_label": "DP", "amount": "Rp 250.000" },
                        { "sequence": 2, "type_label": "Pelunasan", "amount": "Rp 750.000" }
                    ]
                }),
            )
            .unwrap();
        assert!(html.contains("&lt;b&gt;Rina&lt;&#x2f;b&gt;"));
        assert!(!html.contains("<b>Rina"));
        assert!(html.contains("Rp 250.000"));
        assert!(html.contains("Rp 750.000"));
        assert!(!html.contains("undefined"));
    }
}
