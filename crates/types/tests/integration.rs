//! Integration tests for types

#[cfg(test)]
mod tests {
    use imgaudit_types::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Settings {
        algorithm: HashAlgorithm,
        color: ColorChoice,
        output: OutputFormat,
    }

    #[test]
    fn test_enums_deserialize_from_toml() {
        let settings: Settings = toml::from_str(
            r#"
            algorithm = "blake3"
            color = "never"
            output = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.algorithm, HashAlgorithm::Blake3);
        assert_eq!(settings.color, ColorChoice::Never);
        assert_eq!(settings.output, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result: Result<Settings, _> = toml::from_str(
            r#"
            algorithm = "md5"
            color = "auto"
            output = "tty"
            "#,
        );
        assert!(result.is_err());
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_algorithm_names_are_case_insensitive() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha256);
    }

    #[test]
    fn test_every_edit_type_parses_from_its_name() {
        for kind in EditType::ALL {
            assert_eq!(kind.to_string().parse::<EditType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_classification_labels() {
        assert_eq!(Classification::Verified.to_string(), "CLEAN");
        assert_eq!(Classification::Unregistered.label(), "NOT REGISTERED");
        assert_eq!(
            serde_json::to_string(&Classification::ApprovedModification).unwrap(),
            "\"approved_modification\""
        );
    }

    #[test]
    fn test_history_order_sql() {
        assert_eq!(HistoryOrder::default(), HistoryOrder::Ascending);
        assert_eq!(HistoryOrder::Descending.as_sql(), "DESC");
    }
}
