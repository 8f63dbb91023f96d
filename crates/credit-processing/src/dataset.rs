//! Training-dataset assembly from the four source tables.
//!
//! The relational store itself is external: callers hand over the client,
//! credit-request, installment and financed-product tables (typically read
//! with [`crate::io::read_table`]) and get back one row per approved request
//! with the twelve input features and the `classe` label. Currency columns
//! stay as raw strings for the pipeline's currency normalizer.

use crate::error::{PipelineError, Result};
use crate::schema::{self, CLASSE, CLASS_BAD, CLASS_GOOD};
use crate::utils::require_series;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::{debug, info};

pub const CLIENT_ID: &str = "clienteid";
pub const REQUEST_ID: &str = "solicitacaoid";
pub const PRODUCT_ID: &str = "produtoid";
pub const STATUS: &str = "status";
pub const BIRTH_DATE: &str = "datanascimento";
pub const COMMERCIAL_NAME: &str = "nomecomercial";

/// Request status kept for training.
pub const STATUS_APPROVED: &str = "Aprovado";
/// Installment status that marks a request as bad credit.
pub const STATUS_OVERDUE: &str = "Vencido";

const OVERDUE_COUNT: &str = "qtd_vencidos";

/// The four source tables.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub clients: DataFrame,
    pub requests: DataFrame,
    pub installments: DataFrame,
    pub products: DataFrame,
}

/// Builds the training table.
pub struct DatasetAssembler {
    reference_date: NaiveDate,
}

impl DatasetAssembler {
    /// Ages are computed relative to `reference_date`.
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    /// Ages relative to today.
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Assemble the training table.
    pub fn assemble(&self, tables: &SourceTables) -> Result<DataFrame> {
        check_columns(&tables.clients, "clients", &client_columns())?;
        check_columns(
            &tables.requests,
            "requests",
            &[
                REQUEST_ID,
                CLIENT_ID,
                PRODUCT_ID,
                STATUS,
                schema::VALOR_SOLICITADO,
                schema::VALOR_TOTAL_BEM,
            ],
        )?;
        check_columns(&tables.installments, "installments", &[REQUEST_ID, STATUS])?;
        check_columns(&tables.products, "products", &[PRODUCT_ID, COMMERCIAL_NAME])?;

        info!(
            "Assembling dataset from {} request(s), {} client(s), {} installment(s)",
            tables.requests.height(),
            tables.clients.height(),
            tables.installments.height()
        );

        let labels = tables
            .installments
            .clone()
            .lazy()
            .group_by([col(REQUEST_ID)])
            .agg([col(STATUS)
                .eq(lit(STATUS_OVERDUE))
                .cast(DataType::UInt32)
                .sum()
                .alias(OVERDUE_COUNT)])
            .with_column(
                when(col(OVERDUE_COUNT).gt(lit(0)))
                    .then(lit(CLASS_BAD))
                    .otherwise(lit(CLASS_GOOD))
                    .alias(CLASSE),
            )
            .select([col(REQUEST_ID), col(CLASSE)]);

        let requests = tables
            .requests
            .clone()
            .lazy()
            .filter(col(STATUS).eq(lit(STATUS_APPROVED)))
            .select([
                col(REQUEST_ID),
                col(CLIENT_ID),
                col(PRODUCT_ID),
                col(schema::VALOR_SOLICITADO),
                col(schema::VALOR_TOTAL_BEM),
            ]);

        let clients = tables
            .clients
            .clone()
            .lazy()
            .select(client_columns().into_iter().map(col).collect::<Vec<_>>());

        let products = tables
            .products
            .clone()
            .lazy()
            .select([col(PRODUCT_ID), col(COMMERCIAL_NAME).alias(schema::PRODUTO)]);

        let mut joined = requests
            .join(
                clients,
                [col(CLIENT_ID)],
                [col(CLIENT_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                products,
                [col(PRODUCT_ID)],
                [col(PRODUCT_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                labels,
                [col(REQUEST_ID)],
                [col(REQUEST_ID)],
                JoinArgs::new(JoinType::Left),
            )
            .with_column(col(CLASSE).fill_null(lit(CLASS_GOOD)))
            .collect()?;

        let birth = require_series(&joined, BIRTH_DATE)?.clone();
        let ages = age_from_birthdate(&birth, self.reference_date)?;
        joined.with_column(ages.with_name(schema::IDADE.into()))?;

        let mut output: Vec<&str> = schema::INPUT_COLUMNS.to_vec();
        output.push(CLASSE);
        let dataset = joined.select(output)?;

        debug!(
            "Label distribution: {} bad of {}",
            count_label(&dataset, CLASS_BAD)?,
            dataset.height()
        );
        info!("Dataset assembled with {} row(s)", dataset.height());
        Ok(dataset)
    }
}

fn client_columns() -> Vec<&'static str> {
    vec![
        CLIENT_ID,
        schema::PROFISSAO,
        schema::TEMPO_PROFISSAO,
        schema::RENDA,
        schema::TIPO_RESIDENCIA,
        schema::ESCOLARIDADE,
        schema::SCORE,
        BIRTH_DATE,
        schema::DEPENDENTES,
        schema::ESTADO_CIVIL,
    ]
}

fn check_columns(df: &DataFrame, table: &str, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| require_series(df, c).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema(format!(
            "{} table is missing column(s): {}",
            table,
            missing.join(", ")
        )))
    }
}

fn count_label(df: &DataFrame, label: &str) -> Result<usize> {
    let series = require_series(df, CLASSE)?;
    Ok(series
        .str()?
        .into_iter()
        .filter(|v| *v == Some(label))
        .count())
}

/// Whole-year difference between each birth date and `reference_date`.
///
/// Accepts Date, Datetime, or ISO `YYYY-MM-DD` strings. Nulls and
/// unparseable strings propagate as null.
pub fn age_from_birthdate(birthdates: &Series, reference_date: NaiveDate) -> Result<Series> {
    let as_date = match birthdates.dtype() {
        DataType::Date => birthdates.clone(),
        // Non-strict: unparseable strings become null
        DataType::Datetime(_, _) | DataType::String => birthdates.cast(&DataType::Date)?,
        other => {
            return Err(PipelineError::Schema(format!(
                "'{}' must be a date, found {}",
                birthdates.name(),
                other
            )));
        }
    };

    let reference_year = reference_date.year();
    let ages: Float64Chunked = as_date
        .date()?
        .year()
        .into_iter()
        .map(|opt| opt.map(|year| f64::from(reference_year - year)))
        .collect();

    Ok(ages.with_name(birthdates.name().clone()).into_series())
}
