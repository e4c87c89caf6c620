//! WireMock converter: drives every stage for each transaction and collects the report.

use std::collections::HashSet;

use crate::error::{Result, Vsi2wmError};
use crate::loader::{ProtocolClass, RawTransaction, SourceDocument, classify, detect_layout};
use crate::models::{BodySpec, ConversionReport, MatchValue, StubMapping, Transaction};

use super::externalizer::{BodyExternalizer, BodyFile, BodyKey};
use super::helpers::{HelperTranslator, TranslateMode, Translation, UnsupportedHelper};
use super::ir_builder::IrBuilder;
use super::mapper::{StubMapper, VariantContext};
use super::priority::assign_priorities;
use super::scenario::analyze_transactions;
use super::selection::{SelectionOutcome, translate_selection};
use super::{ConvertOptions, Converter};

/// Everything one run produces, ready for the writer
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub stubs: Vec<StubMapping>,
    /// Externalized response bodies
    pub files: Vec<BodyFile>,
    pub report: ConversionReport,
}

/// Converter producing WireMock stub mappings
#[derive(Debug, Clone, Copy, Default)]
pub struct WireMockConverter;

impl WireMockConverter {
    pub fn new() -> Self {
        Self
    }
}

/// A transaction after helper translation, with what could not be translated
struct TranslatedTransaction {
    transaction: Transaction,
    request_complete: bool,
    variants_complete: Vec<bool>,
    translated: usize,
    /// (location, call) pairs replaced by a sentinel
    unsupported: Vec<(String, String)>,
}

#[derive(Default)]
struct TranslationTally {
    complete: bool,
    translated: usize,
    unsupported: Vec<(String, String)>,
}

impl TranslationTally {
    fn new() -> Self {
        Self {
            complete: true,
            ..Default::default()
        }
    }

    fn apply(&mut self, location: &str, translation: Translation) -> String {
        self.translated += translation.translated;
        self.complete &= translation.is_complete();
        self.unsupported.extend(
            translation
                .unsupported
                .into_iter()
                .map(|call| (location.to_string(), call)),
        );
        translation.text
    }

    fn body(
        &mut self,
        translator: &HelperTranslator,
        location: &str,
        body: Option<BodySpec>,
    ) -> std::result::Result<Option<BodySpec>, UnsupportedHelper> {
        let Some(body) = body else { return Ok(None) };
        let translation = translator.translate(body.content())?;
        if translation.translated == 0 && translation.is_complete() {
            return Ok(Some(body));
        }
        // Template expressions can change the structural kind, so detect again
        Ok(Some(BodySpec::detect(self.apply(location, translation))))
    }
}

fn translate_transaction(
    translator: &HelperTranslator,
    mut transaction: Transaction,
) -> std::result::Result<TranslatedTransaction, UnsupportedHelper> {
    let mut translated = 0;
    let mut unsupported = Vec::new();

    let mut request_tally = TranslationTally::new();
    for (name, value) in transaction.request.headers.iter_mut() {
        if let MatchValue::Exact(literal) = value {
            let translation = translator.translate(literal)?;
            *literal = request_tally.apply(&format!("request header {}", name), translation);
        }
    }
    transaction.request.body =
        request_tally.body(translator, "request body", transaction.request.body.take())?;
    translated += request_tally.translated;
    unsupported.extend(request_tally.unsupported);

    let mut variants_complete = Vec::with_capacity(transaction.responses.len());
    for (index, variant) in transaction.responses.iter_mut().enumerate() {
        let mut tally = TranslationTally::new();
        for (name, value) in variant.headers.iter_mut() {
            let translation = translator.translate(value)?;
            *value = tally.apply(&format!("response {} header {}", index, name), translation);
        }
        variant.body = tally.body(
            translator,
            &format!("response {} body", index),
            variant.body.take(),
        )?;

        translated += tally.translated;
        variants_complete.push(tally.complete);
        unsupported.extend(tally.unsupported);
    }

    Ok(TranslatedTransaction {
        transaction,
        request_complete: request_tally.complete,
        variants_complete,
        translated,
        unsupported,
    })
}

impl Converter for WireMockConverter {
    type Output = ConversionOutput;

    fn convert_document(
        &self,
        document: &SourceDocument,
        source_name: &str,
        options: &ConvertOptions,
    ) -> Result<ConversionOutput> {
        let span = tracing::info_span!("convert", source = source_name);
        let _enter = span.enter();

        let mut report = ConversionReport::new(source_name);
        report.source_version = document.source_version.clone();
        report.build_number = document.build_number.clone();

        let layout = detect_layout(document);
        report.add_note(format!("Detected layout: {}", layout));
        for warning in layout.warnings() {
            report.add_warning(warning);
        }

        let mut run = Run {
            builder: IrBuilder::new(&layout),
            translator: HelperTranslator::new(if options.strict {
                TranslateMode::Strict
            } else {
                TranslateMode::Lenient
            }),
            mapper: StubMapper::new(options.soap_match, options.latency),
            externalizer: BodyExternalizer::new(options.max_inline_bytes),
            seen_ids: HashSet::new(),
            stubs: Vec::new(),
            files: Vec::new(),
            converted: Vec::new(),
            report,
        };

        for raw in document.transactions() {
            run.transaction(&raw, &layout)?;
        }

        let Run {
            stubs,
            files,
            converted,
            mut report,
            ..
        } = run;

        report.counts.stubs_generated = stubs.len();
        if options.analyze_scenario {
            report.scenario = Some(analyze_transactions(&converted));
        }

        tracing::info!(
            transactions = report.counts.transactions_seen,
            stubs = report.counts.stubs_generated,
            warnings = report.warnings.len(),
            "Conversion finished"
        );

        Ok(ConversionOutput {
            stubs,
            files,
            report,
        })
    }
}

/// State of one conversion run
struct Run<'l> {
    builder: IrBuilder<'l>,
    translator: HelperTranslator,
    mapper: StubMapper,
    externalizer: BodyExternalizer,
    seen_ids: HashSet<String>,
    stubs: Vec<StubMapping>,
    files: Vec<BodyFile>,
    converted: Vec<Transaction>,
    report: ConversionReport,
}

impl Run<'_> {
    /// Convert one raw transaction. Only fatal conditions are returned as errors;
    /// everything else ends up in the report.
    fn transaction(
        &mut self,
        raw: &RawTransaction<'_>,
        layout: &crate::loader::DocumentLayout,
    ) -> Result<()> {
        self.report.counts.transactions_seen += 1;
        let id = raw.id();

        if !raw.has_declared_id() {
            self.report.add_warning(format!(
                "Transaction at position {} has no id; using '{}'",
                raw.index, id
            ));
        }
        if !self.seen_ids.insert(id.clone()) {
            self.report
                .add_warning(format!("Duplicate transaction id '{}'", id));
        }

        if let ProtocolClass::Other(protocol) = classify(raw, layout) {
            self.report.counts.transactions_skipped_non_http += 1;
            self.report.add_warning(format!(
                "Skipping non-HTTP transaction '{}' (protocol: {})",
                id, protocol
            ));
            return Ok(());
        }

        let transaction = match self.builder.build(raw) {
            Ok(built) => {
                for issue in &built.issues {
                    self.report
                        .add_warning(format!("Transaction '{}' {}", id, issue));
                }
                built.transaction
            }
            Err(e) => {
                self.report.counts.transactions_quarantined += 1;
                self.report
                    .add_warning(format!("Quarantined transaction '{}': {}", id, e));
                return Ok(());
            }
        };
        tracing::debug!(
            transaction = %transaction.id,
            variants = transaction.responses.len(),
            "Built transaction"
        );

        let translated = translate_transaction(&self.translator, transaction).map_err(|e| {
            Vsi2wmError::StrictHelper {
                transaction_id: id.clone(),
                helper: e.call,
            }
        })?;

        self.report.counts.helpers_translated += translated.translated;
        self.report.counts.helpers_unsupported += translated.unsupported.len();
        for (location, call) in &translated.unsupported {
            self.report.add_warning(format!(
                "Unsupported helper {} in {} of transaction '{}'",
                call, location, id
            ));
        }

        self.map_variants(raw.index, &translated);
        self.report.counts.variants_converted += translated.transaction.responses.len();
        self.converted.push(translated.transaction);
        Ok(())
    }

    fn map_variants(&mut self, transaction_index: usize, translated: &TranslatedTransaction) {
        let transaction = &translated.transaction;

        let mut mapped = Vec::with_capacity(transaction.responses.len());
        for (index, variant) in transaction.responses.iter().enumerate() {
            let (constraints, selection_complete) = match variant.selection_logic.as_deref() {
                None => (Vec::new(), true),
                Some(script) => match translate_selection(script) {
                    SelectionOutcome::Static(constraints) => (constraints, true),
                    SelectionOutcome::Untranslatable => {
                        self.report.add_warning(format!(
                            "Selection logic of transaction '{}' response {} needs manual review",
                            transaction.id, index
                        ));
                        (Vec::new(), false)
                    }
                },
            };

            let helpers_complete = translated.request_complete
                && translated.variants_complete.get(index).copied().unwrap_or(true);
            let context = VariantContext {
                constraints: &constraints,
                manual_review: !(selection_complete && helpers_complete),
            };
            mapped.push((index, self.mapper.map(transaction, variant, &context)));
        }

        for (index, stub) in assign_priorities(mapped) {
            let key = BodyKey {
                transaction_id: &transaction.id,
                transaction_index,
                variant_index: index,
            };
            let body = transaction.responses.get(index).and_then(|v| v.body.as_ref());
            let (stub, file) = self.externalizer.externalize(stub, body, key);
            if let Some(file) = file {
                self.report.counts.bodies_externalized += 1;
                self.files.push(file);
            }
            self.stubs.push(stub);
        }
    }
}
