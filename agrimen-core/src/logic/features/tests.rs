//! Integration tests for feature alignment
//!
//! Schema + encoders + scaler wired together the way artifacts load them.

#[cfg(test)]
mod integration_tests {
    use std::collections::HashMap;

    use crate::error::{AlignError, ArtifactError};
    use crate::logic::features::{
        DerivedFeature, DerivedOp, FeatureAligner, FeatureLayout, FeatureSchema, FieldSpec, FittedScaler,
        InputRecord, LabelEncoder, RawValue, ScalerArtifact, ScalerParams, SourceColumn, UnknownCategoryPolicy,
    };
    use crate::logic::locale::LocaleCatalog;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Label-encoded yield model: Crop, Season, State + numerics
    fn yield_aligner() -> FeatureAligner {
        let layout = FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: vec![
                SourceColumn::label("Crop"),
                SourceColumn::numeric("Crop_Year"),
                SourceColumn::label("Season"),
                SourceColumn::label("State"),
                SourceColumn::numeric("Area"),
                SourceColumn::numeric("Annual_Rainfall"),
            ],
            derived: vec![],
            feature_names: vec![],
            layout_hash: None,
        })
        .unwrap();

        let mut encoders = HashMap::new();
        encoders.insert("Crop".to_string(), LabelEncoder::from_strs(&["Maize", "Rice", "Wheat"]).unwrap());
        encoders.insert("Season".to_string(), LabelEncoder::from_strs(&["Kharif", "Rabi", "Whole Year"]).unwrap());
        encoders.insert("State".to_string(), LabelEncoder::from_strs(&["Assam", "Odisha", "Punjab"]).unwrap());

        FeatureAligner::new(layout, encoders, FittedScaler::identity(), UnknownCategoryPolicy::Ignore).unwrap()
    }

    /// One-hot price model: District, Commodity + Year
    fn price_aligner(policy: UnknownCategoryPolicy) -> FeatureAligner {
        let layout = FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: vec![
                SourceColumn::one_hot("District"),
                SourceColumn::one_hot("Commodity"),
                SourceColumn::numeric("Year"),
            ],
            derived: vec![],
            feature_names: names(&[
                "Year",
                "District_Cuttack",
                "District_Puri",
                "Commodity_Paddy",
                "Commodity_Onion",
            ]),
            layout_hash: None,
        })
        .unwrap();

        FeatureAligner::new(layout, HashMap::new(), FittedScaler::identity(), policy).unwrap()
    }

    fn yield_record() -> InputRecord {
        InputRecord::new()
            .with("Crop", "Rice")
            .with("Crop_Year", 2019.0)
            .with("Season", "Kharif")
            .with("State", "Odisha")
            .with("Area", 1000.0)
            .with("Annual_Rainfall", 1400.5)
    }

    #[test]
    fn test_width_and_order_match_schema() {
        let aligner = yield_aligner();
        let v = aligner.align(&yield_record()).unwrap();
        assert_eq!(v.len(), aligner.layout().width());
        assert_eq!(v.values, vec![1.0, 2019.0, 0.0, 1.0, 1000.0, 1400.5]);
    }

    #[test]
    fn test_alignment_is_deterministic() {
        let aligner = yield_aligner();
        let a = aligner.align(&yield_record()).unwrap();
        let b = aligner.align(&yield_record()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_label_category_is_error() {
        let aligner = yield_aligner();
        let record = yield_record().with("Season", "Autumn");
        let err = aligner.align(&record).unwrap_err();
        assert_eq!(
            err,
            AlignError::UnknownCategory { column: "Season".to_string(), value: "Autumn".to_string() }
        );
    }

    #[test]
    fn test_unknown_one_hot_category_is_zero_group() {
        let aligner = price_aligner(UnknownCategoryPolicy::Ignore);
        let record = InputRecord::new()
            .with("District", "Puri")
            .with("Commodity", "Mango")
            .with("Year", 2021.0);
        let v = aligner.align(&record).unwrap();
        assert_eq!(v.values, vec![2021.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_one_hot_category_rejected_by_policy() {
        let aligner = price_aligner(UnknownCategoryPolicy::Reject);
        let record = InputRecord::new()
            .with("District", "Puri")
            .with("Commodity", "Mango")
            .with("Year", 2021.0);
        let err = aligner.align(&record).unwrap_err();
        assert!(matches!(err, AlignError::UnknownCategory { ref column, .. } if column == "Commodity"));
    }

    #[test]
    fn test_pre_expanded_indicators() {
        let aligner = price_aligner(UnknownCategoryPolicy::Ignore);
        let record = InputRecord::new()
            .with("Year", "2020")
            .with("District_Cuttack", "1")
            .with("Commodity_Onion", 1.0);
        let v = aligner.align(&record).unwrap();
        assert_eq!(v.values, vec![2020.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_extra_columns_dropped() {
        let aligner = yield_aligner();
        let record = yield_record().with("Production", 5000.0).with("Notes", "irrigated");
        let v = aligner.align(&record).unwrap();
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn test_missing_columns_in_schema_order() {
        let aligner = yield_aligner();
        let mut record = yield_record();
        record.remove("State");
        record.remove("Crop");
        let err = aligner.align(&record).unwrap_err();
        assert_eq!(err, AlignError::MissingColumns(names(&["Crop", "State"])));
    }

    #[test]
    fn test_invalid_number() {
        let aligner = yield_aligner();
        let record = yield_record().with("Area", "ten");
        let err = aligner.align(&record).unwrap_err();
        assert!(matches!(err, AlignError::InvalidNumber { ref column, ref value } if column == "Area" && value == "ten"));
    }

    #[test]
    fn test_check_columns_headers() {
        let aligner = price_aligner(UnknownCategoryPolicy::Ignore);
        assert!(aligner.check_columns(&names(&["District", "Commodity", "Year", "Extra"])).is_ok());
        // indicator columns satisfy their group
        assert!(aligner.check_columns(&names(&["District_Puri", "Commodity", "Year"])).is_ok());
        assert_eq!(
            aligner.check_columns(&names(&["District", "Year"])),
            Err(AlignError::MissingColumns(names(&["Commodity"])))
        );
    }

    #[test]
    fn test_derived_product_before_robust_scaling() {
        let layout = FeatureLayout::compile(FeatureSchema {
            version: 2,
            columns: vec![
                SourceColumn::one_hot("Crop"),
                SourceColumn::numeric("Rainfall"),
                SourceColumn::numeric("Pesticide"),
            ],
            derived: vec![DerivedFeature {
                name: "Rainfall_Pesticide".to_string(),
                op: DerivedOp::Product,
                inputs: names(&["Rainfall", "Pesticide"]),
            }],
            feature_names: names(&["Rainfall", "Pesticide", "Rainfall_Pesticide", "Crop_Rice", "Crop_Maize"]),
            layout_hash: None,
        })
        .unwrap();

        let scaler = FittedScaler::bind(
            &ScalerArtifact {
                columns: names(&["Rainfall", "Pesticide", "Rainfall_Pesticide"]),
                params: ScalerParams::Robust { center: vec![1000.0, 10.0, 10000.0], scale: vec![500.0, 5.0, 5000.0] },
            },
            &layout,
        )
        .unwrap();

        let aligner = FeatureAligner::new(layout, HashMap::new(), scaler, UnknownCategoryPolicy::Ignore).unwrap();
        let record = InputRecord::new()
            .with("Crop", "Maize")
            .with("Rainfall", 1500.0)
            .with("Pesticide", 20.0);

        let unscaled = aligner.align_unscaled(&record).unwrap();
        assert_eq!(unscaled, vec![1500.0, 20.0, 30000.0, 0.0, 1.0]);

        let v = aligner.align(&record).unwrap();
        assert_eq!(v.values, vec![1.0, 2.0, 4.0, 0.0, 1.0]);
    }

    #[test]
    fn test_align_rows_reports_row_number() {
        let aligner = yield_aligner();
        let rows = vec![yield_record(), yield_record().with("Crop", "Barley"), yield_record()];
        let err = aligner.align_rows(&rows).unwrap_err();
        assert!(matches!(err, AlignError::Row { row: 2, .. }));
        assert!(matches!(err.root(), AlignError::UnknownCategory { .. }));

        let ok = aligner.align_rows(&[yield_record(), yield_record()]).unwrap();
        assert_eq!(ok.n_rows(), 2);
        assert_eq!(ok.n_features(), 6);
    }

    #[test]
    fn test_clamp_to_fields() {
        let mut ph = SourceColumn::numeric("ph");
        ph.field = Some(FieldSpec::range(0.0, 14.0, 6.5));
        let layout = FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: vec![ph, SourceColumn::numeric("rainfall")],
            derived: vec![],
            feature_names: vec![],
            layout_hash: None,
        })
        .unwrap();
        let aligner =
            FeatureAligner::new(layout, HashMap::new(), FittedScaler::identity(), UnknownCategoryPolicy::Ignore)
                .unwrap();

        let mut record = InputRecord::new().with("ph", "17.5").with("rainfall", 5000.0);
        aligner.clamp_to_fields(&mut record);
        assert_eq!(record.get("ph"), Some(&RawValue::Number(14.0)));
        // no range declared
        assert_eq!(record.get("rainfall"), Some(&RawValue::Number(5000.0)));
    }

    #[test]
    fn test_encoder_wiring_validated() {
        let layout = || {
            FeatureLayout::compile(FeatureSchema {
                version: 1,
                columns: vec![SourceColumn::label("Crop"), SourceColumn::numeric("Area")],
                derived: vec![],
                feature_names: vec![],
                layout_hash: None,
            })
            .unwrap()
        };

        let missing = FeatureAligner::new(layout(), HashMap::new(), FittedScaler::identity(), Default::default());
        assert!(matches!(missing, Err(ArtifactError::InvalidEncoder(_))));

        let mut extra = HashMap::new();
        extra.insert("Crop".to_string(), LabelEncoder::from_strs(&["Rice"]).unwrap());
        extra.insert("Area".to_string(), LabelEncoder::from_strs(&["1"]).unwrap());
        let wrong = FeatureAligner::new(layout(), extra, FittedScaler::identity(), Default::default());
        assert!(matches!(wrong, Err(ArtifactError::InvalidEncoder(_))));
    }

    /// Season fitted on the raw padded values of the yield dataset
    fn padded_season_aligners() -> (FeatureAligner, FeatureAligner) {
        let label_layout = FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: vec![SourceColumn::label("Season"), SourceColumn::numeric("Area")],
            derived: vec![],
            feature_names: vec![],
            layout_hash: None,
        })
        .unwrap();
        let mut encoders = HashMap::new();
        encoders.insert(
            "Season".to_string(),
            LabelEncoder::from_strs(&["Kharif     ", "Rabi       "]).unwrap(),
        );
        let label =
            FeatureAligner::new(label_layout, encoders, FittedScaler::identity(), UnknownCategoryPolicy::Ignore)
                .unwrap();

        let one_hot_layout = FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: vec![SourceColumn::one_hot("Season"), SourceColumn::numeric("Area")],
            derived: vec![],
            feature_names: names(&["Season_Kharif     ", "Season_Rabi       ", "Area"]),
            layout_hash: None,
        })
        .unwrap();
        let one_hot =
            FeatureAligner::new(one_hot_layout, HashMap::new(), FittedScaler::identity(), UnknownCategoryPolicy::Ignore)
                .unwrap();

        (label, one_hot)
    }

    #[test]
    fn test_padded_fitted_categories_match_raw_and_trimmed_input() {
        let (label, one_hot) = padded_season_aligners();

        for season in ["Kharif     ", "Kharif", " Kharif "] {
            let record = InputRecord::new().with("Season", season).with("Area", 10.0);
            assert_eq!(label.align(&record).unwrap().values, vec![0.0, 10.0], "label {:?}", season);
            assert_eq!(one_hot.align(&record).unwrap().values, vec![1.0, 0.0, 10.0], "one-hot {:?}", season);
        }

        let record = InputRecord::new().with("Season", "Autumn").with("Area", 10.0);
        assert_eq!(
            label.align(&record).unwrap_err(),
            AlignError::UnknownCategory { column: "Season".to_string(), value: "Autumn".to_string() }
        );
        assert_eq!(one_hot.align(&record).unwrap().values, vec![0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_offered_form_options_align() {
        let (label, _) = padded_season_aligners();
        let fields = label.form_fields(LocaleCatalog::builtin(), "en");
        for option in &fields[0].options {
            let record = InputRecord::new().with("Season", option.as_str()).with("Area", 1.0);
            assert!(label.align(&record).is_ok(), "option {:?}", option);
        }
    }

    #[test]
    fn test_raw_value_preferred_over_trimmed() {
        let layout = FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: vec![SourceColumn::label("Grade")],
            derived: vec![],
            feature_names: vec![],
            layout_hash: None,
        })
        .unwrap();
        let mut encoders = HashMap::new();
        encoders.insert("Grade".to_string(), LabelEncoder::from_strs(&["FAQ", "FAQ "]).unwrap());
        let aligner =
            FeatureAligner::new(layout, encoders, FittedScaler::identity(), UnknownCategoryPolicy::Ignore).unwrap();

        let exact = InputRecord::new().with("Grade", "FAQ ");
        assert_eq!(aligner.align(&exact).unwrap().values, vec![1.0]);
        let trimmed = InputRecord::new().with("Grade", " FAQ");
        assert_eq!(aligner.align(&trimmed).unwrap().values, vec![0.0]);
    }
}
