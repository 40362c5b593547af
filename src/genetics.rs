//! Genotype-specific training annotations
//!
//! Independent of the alert outcome; merged with it for display only.

use serde::{Deserialize, Serialize};

use crate::models::GenotypeMap;

/// A qualitative trait and the training strategy that goes with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneticAnnotation {
    pub gene: String,
    pub trait_name: String,
    pub recommendation: String,
}

impl GeneticAnnotation {
    fn new(gene: &str, trait_name: &str, recommendation: &str) -> Self {
        Self {
            gene: gene.to_string(),
            trait_name: trait_name.to_string(),
            recommendation: recommendation.to_string(),
        }
    }
}

/// Known variant of a gene and its annotation text
struct VariantRule {
    genotype: &'static str,
    label: &'static str,
    trait_name: &'static str,
    recommendation: &'static str,
}

/// Genes are checked in this order; the first matching variant per gene wins
const GENE_RULES: &[(&str, &[VariantRule])] = &[
    (
        "PER3",
        &[
            VariantRule {
                genotype: "long",
                label: "PER3 (Long variant)",
                trait_name: "Natural night owl tendency",
                recommendation: "Allow later bedtimes when possible, prioritize consistent wake times, use bright light therapy in morning",
            },
            VariantRule {
                genotype: "short",
                label: "PER3 (Short variant)",
                trait_name: "Natural early bird tendency",
                recommendation: "Optimize early morning training, avoid late evening intense exercise, maintain regular early bedtime",
            },
        ],
    ),
    (
        "CLOCK",
        &[VariantRule {
            genotype: "AA",
            label: "CLOCK (AA genotype)",
            trait_name: "Enhanced circadian sensitivity",
            recommendation: "Maintain strict sleep schedule, minimize blue light exposure 2h before bed, prioritize sleep environment optimization",
        }],
    ),
    (
        "ACTN3",
        &[
            VariantRule {
                genotype: "XX",
                label: "ACTN3 (XX genotype)",
                trait_name: "Enhanced endurance capacity",
                recommendation: "Focus on aerobic base building, longer recovery periods between high-intensity sessions, emphasize mitochondrial health",
            },
            VariantRule {
                genotype: "RR",
                label: "ACTN3 (RR genotype)",
                trait_name: "Enhanced power/sprint capacity",
                recommendation: "Optimize explosive training, shorter but more intense sessions, focus on neuromuscular recovery",
            },
        ],
    ),
];

pub struct GeneticAnnotator;

impl GeneticAnnotator {
    /// Annotations in PER3, CLOCK, ACTN3 order, at most one per gene.
    ///
    /// Genotype labels match exactly; anything unrecognized is skipped.
    pub fn annotate(genotype: &GenotypeMap) -> Vec<GeneticAnnotation> {
        GENE_RULES
            .iter()
            .filter_map(|(gene, variants)| {
                let observed = genotype.get(gene)?;
                variants
                    .iter()
                    .find(|v| v.genotype == observed)
                    .map(|v| GeneticAnnotation::new(v.label, v.trait_name, v.recommendation))
            })
            .collect()
    }

    /// Genes this annotator knows about
    pub fn known_genes() -> impl Iterator<Item = &'static str> {
        GENE_RULES.iter().map(|(gene, _)| *gene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genotype(pairs: &[(&str, &str)]) -> GenotypeMap {
        pairs.iter().map(|(g, v)| (g.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_empty_map_yields_nothing() {
        assert!(GeneticAnnotator::annotate(&GenotypeMap::new()).is_empty());
    }

    #[test]
    fn test_fixed_gene_order() {
        let map = genotype(&[("ACTN3", "RR"), ("CLOCK", "AA"), ("PER3", "long")]);
        let genes: Vec<String> = GeneticAnnotator::annotate(&map)
            .into_iter()
            .map(|a| a.gene)
            .collect();

        assert_eq!(
            genes,
            vec!["PER3 (Long variant)", "CLOCK (AA genotype)", "ACTN3 (RR genotype)"]
        );
    }

    #[test]
    fn test_variant_texts() {
        let short = GeneticAnnotator::annotate(&genotype(&[("PER3", "short")]));
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].trait_name, "Natural early bird tendency");

        let endurance = GeneticAnnotator::annotate(&genotype(&[("ACTN3", "XX")]));
        assert_eq!(endurance[0].trait_name, "Enhanced endurance capacity");
    }

    #[test]
    fn test_unrecognized_genotypes_are_skipped() {
        let map = genotype(&[
            ("PER3", "Long"),
            ("CLOCK", "AG"),
            ("ACTN3", "RX"),
            ("COMT", "AA"),
        ]);
        assert!(GeneticAnnotator::annotate(&map).is_empty());
    }

    #[test]
    fn test_known_genes() {
        let genes: Vec<&str> = GeneticAnnotator::known_genes().collect();
        assert_eq!(genes, vec!["PER3", "CLOCK", "ACTN3"]);
    }
}
