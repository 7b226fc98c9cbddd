//! Platform-specific analyzer services.

use strata_config::Platform;

/// Static per-platform knowledge the resolvers consult, such as the packages
/// every file of a module imports implicitly.
#[derive(Debug, PartialEq, Eq)]
pub struct AnalyzerServices {
    /// The platform these services describe.
    pub platform: Platform,
    /// Packages imported into every file without an explicit import.
    pub default_imports: &'static [&'static str],
}

const COMMON_SERVICES: AnalyzerServices = AnalyzerServices {
    platform: Platform::Common,
    default_imports: &["core", "core.collections", "core.text"],
};

const JVM_SERVICES: AnalyzerServices = AnalyzerServices {
    platform: Platform::Jvm,
    default_imports: &["core", "core.collections", "core.text", "jvm.lang"],
};

const JS_SERVICES: AnalyzerServices = AnalyzerServices {
    platform: Platform::Js,
    default_imports: &["core", "core.collections", "core.text", "js.dom"],
};

const NATIVE_SERVICES: AnalyzerServices = AnalyzerServices {
    platform: Platform::Native,
    default_imports: &["core", "core.collections", "core.text", "native.interop"],
};

const WASM_SERVICES: AnalyzerServices = AnalyzerServices {
    platform: Platform::Wasm,
    default_imports: &["core", "core.collections", "core.text", "wasm.host"],
};

/// Returns the analyzer services of `platform`.
pub fn analyzer_services(platform: Platform) -> &'static AnalyzerServices {
    match platform {
        Platform::Common => &COMMON_SERVICES,
        Platform::Jvm => &JVM_SERVICES,
        Platform::Js => &JS_SERVICES,
        Platform::Native => &NATIVE_SERVICES,
        Platform::Wasm => &WASM_SERVICES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_imports_core() {
        for platform in [
            Platform::Common,
            Platform::Jvm,
            Platform::Js,
            Platform::Native,
            Platform::Wasm,
        ] {
            let services = analyzer_services(platform);
            assert_eq!(services.platform, platform);
            assert!(services.default_imports.contains(&"core"));
        }
    }

    #[test]
    fn common_has_no_platform_package() {
        assert!(!analyzer_services(Platform::Common)
            .default_imports
            .contains(&"jvm.lang"));
    }
}
