use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============ Input ============

/// Minimum number of positional fields a registry export row must carry.
pub const MIN_INPUT_FIELDS: usize = 28;

/// Positions of the fields the pipeline reads from an input row.
pub mod columns {
    pub const CNPJ_ROOT: usize = 0;
    pub const CNPJ_ORDER: usize = 1;
    pub const CNPJ_CHECK_DIGITS: usize = 2;
    pub const AREA_CODE: usize = 21;
    pub const PHONE: usize = 22;
    pub const EMAIL: usize = 27;
}

/// One decoded line of the semicolon-delimited registry export.
///
/// Held for the duration of a pipeline run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    fields: Vec<String>,
}

impl InputRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the row has every positional field the pipeline reads.
    pub fn is_complete(&self) -> bool {
        self.fields.len() >= MIN_INPUT_FIELDS
    }

    /// Field at `index` with surrounding quote and space characters removed.
    /// Missing positions read as an empty string.
    pub fn trimmed(&self, index: usize) -> &str {
        self.fields
            .get(index)
            .map(|f| crate::validator::trim_field(f))
            .unwrap_or("")
    }

    /// Contact fields carried over to the output: (area code, phone, email).
    pub fn contact(&self) -> (String, String, String) {
        (
            self.trimmed(columns::AREA_CODE).to_string(),
            self.trimmed(columns::PHONE).to_string(),
            self.trimmed(columns::EMAIL).to_string(),
        )
    }
}

impl<S: Into<String>> FromIterator<S> for InputRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

// ============ Identifier ============

/// A CNPJ that passed validation (exactly 14 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompanyIdentifier(String);

impl CompanyIdentifier {
    /// Returns `None` unless `raw` passes [`crate::validator::validate`].
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if crate::validator::validate(&raw) {
            Some(Self(raw))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============ Registry lookup ============

/// Company record returned by the registry lookup service.
///
/// Absent or `null` text fields decode as empty strings and an absent
/// capital as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCompany {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cnpj: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub razao_social: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nome_fantasia: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capital_social: BigDecimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logradouro: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub municipio: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uf: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cep: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Output ============

/// Column names of the generated file, in order.
pub const OUTPUT_HEADER: [&str; 11] = [
    "CNPJ",
    "RazaoSocial",
    "NomeFantasia",
    "CapitalSocial",
    "Logradouro",
    "Municipio",
    "UF",
    "CEP",
    "DDD",
    "Telefone",
    "Email",
];

/// Looked-up company merged with the contact fields of its source row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub cnpj: String,
    pub razao_social: String,
    pub nome_fantasia: String,
    pub capital_social: BigDecimal,
    pub logradouro: String,
    pub municipio: String,
    pub uf: String,
    pub cep: String,
    pub ddd: String,
    pub telefone: String,
    pub email: String,
}

impl OutputRecord {
    /// Merges registry data with area code, phone and email from `row`.
    ///
    /// The identifier written is the one extracted from the input row.
    pub fn merge(id: &CompanyIdentifier, company: EnrichedCompany, row: &InputRow) -> Self {
        let (ddd, telefone, email) = row.contact();
        Self {
            cnpj: id.to_string(),
            razao_social: company.razao_social,
            nome_fantasia: company.nome_fantasia,
            capital_social: company.capital_social,
            logradouro: company.logradouro,
            municipio: company.municipio,
            uf: company.uf,
            cep: company.cep,
            ddd,
            telefone,
            email,
        }
    }

    /// Fields in [`OUTPUT_HEADER`] order.
    pub fn to_fields(&self) -> [String; 11] {
        [
            self.cnpj.clone(),
            self.razao_social.clone(),
            self.nome_fantasia.clone(),
            format_capital(&self.capital_social),
            self.logradouro.clone(),
            self.municipio.clone(),
            self.uf.clone(),
            self.cep.clone(),
            self.ddd.clone(),
            self.telefone.clone(),
            self.email.clone(),
        ]
    }
}

/// Formats a capital value with exactly two decimal places.
pub fn format_capital(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

// ============ Pipeline reporting ============

/// Why a row produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewFields,
    InvalidIdentifier,
    RecentlyProcessed,
    LookupFailed,
    BelowThreshold,
    WriteFailed,
}

/// Terminal state of one input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Written,
    Skipped(SkipReason),
}

impl RowOutcome {
    /// Whether the row got as far as a registry request.
    pub fn issued_lookup(self) -> bool {
        !matches!(
            self,
            RowOutcome::Skipped(
                SkipReason::TooFewFields
                    | SkipReason::InvalidIdentifier
                    | SkipReason::RecentlyProcessed
            )
        )
    }
}

/// Per-run counters, logged when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub rows: usize,
    pub lookups: usize,
    pub written: usize,
    pub too_few_fields: usize,
    pub invalid_identifier: usize,
    pub recently_processed: usize,
    pub lookup_failed: usize,
    pub below_threshold: usize,
    pub write_failed: usize,
}

impl PipelineSummary {
    pub fn record(&mut self, outcome: RowOutcome) {
        self.rows += 1;
        if outcome.issued_lookup() {
            self.lookups += 1;
        }
        match outcome {
            RowOutcome::Written => self.written += 1,
            RowOutcome::Skipped(reason) => match reason {
                SkipReason::TooFewFields => self.too_few_fields += 1,
                SkipReason::InvalidIdentifier => self.invalid_identifier += 1,
                SkipReason::RecentlyProcessed => self.recently_processed += 1,
                SkipReason::LookupFailed => self.lookup_failed += 1,
                SkipReason::BelowThreshold => self.below_threshold += 1,
                SkipReason::WriteFailed => self.write_failed += 1,
            },
        }
    }

    pub fn skipped(&self) -> usize {
        self.rows - self.written
    }
}
