//! Column names and canonical vocabularies of the loan-application table.
//!
//! Names follow the source database, so they stay in Portuguese.

pub const PROFISSAO: &str = "profissao";
pub const TEMPO_PROFISSAO: &str = "tempoprofissao";
pub const RENDA: &str = "renda";
pub const TIPO_RESIDENCIA: &str = "tiporesidencia";
pub const ESCOLARIDADE: &str = "escolaridade";
pub const SCORE: &str = "score";
pub const IDADE: &str = "idade";
pub const DEPENDENTES: &str = "dependentes";
pub const ESTADO_CIVIL: &str = "estadocivil";
pub const PRODUTO: &str = "produto";
pub const VALOR_SOLICITADO: &str = "valorsolicitado";
pub const VALOR_TOTAL_BEM: &str = "valortotalbem";

/// Derived `valorsolicitado / valortotalbem`.
pub const PROPORCAO_SOLICITADO_TOTAL: &str = "proporcaosolicitadototal";

/// Training label: `bom` or `ruim`.
pub const CLASSE: &str = "classe";
pub const CLASS_GOOD: &str = "bom";
pub const CLASS_BAD: &str = "ruim";

/// The twelve columns every inference request must carry, in training order.
pub const INPUT_COLUMNS: [&str; 12] = [
    PROFISSAO,
    TEMPO_PROFISSAO,
    RENDA,
    TIPO_RESIDENCIA,
    ESCOLARIDADE,
    SCORE,
    IDADE,
    DEPENDENTES,
    ESTADO_CIVIL,
    PRODUTO,
    VALOR_SOLICITADO,
    VALOR_TOTAL_BEM,
];

/// Numeric columns that get a fitted scaler (ratio included).
pub const NUMERIC_COLUMNS: [&str; 7] = [
    TEMPO_PROFISSAO,
    RENDA,
    IDADE,
    DEPENDENTES,
    VALOR_SOLICITADO,
    VALOR_TOTAL_BEM,
    PROPORCAO_SOLICITADO_TOTAL,
];

/// Categorical columns that get a fitted encoder.
pub const CATEGORICAL_COLUMNS: [&str; 6] = [
    PROFISSAO,
    TIPO_RESIDENCIA,
    ESCOLARIDADE,
    SCORE,
    ESTADO_CIVIL,
    PRODUTO,
];

/// Columns stored as locale-formatted currency strings in the source.
pub const CURRENCY_COLUMNS: [&str; 2] = [VALOR_SOLICITADO, VALOR_TOTAL_BEM];

/// Valid professions; free-text entries are corrected against this list.
pub const PROFESSIONS: [&str; 9] = [
    "Advogado",
    "Arquiteto",
    "Cientista de Dados",
    "Contador",
    "Dentista",
    "Empresário",
    "Engenheiro",
    "Médico",
    "Programador",
];

/// Check whether `name` is one of the twelve request columns.
pub fn is_input_column(name: &str) -> bool {
    INPUT_COLUMNS.contains(&name)
}
