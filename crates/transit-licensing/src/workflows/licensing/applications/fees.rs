use super::domain::{ApplicationType, FeeBreakdown};

/// Base charges for an application type, before penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseFees {
    pub application_fee: u32,
    pub test_fee: u32,
    pub license_fee: u32,
}

const NEW_LICENSE: BaseFees = BaseFees {
    application_fee: 100,
    test_fee: 200,
    license_fee: 300,
};

/// Look up the base fee triple. Unrecognized types are charged as a new license.
pub fn base_fees(application_type: &ApplicationType) -> BaseFees {
    match application_type {
        ApplicationType::NewLicense | ApplicationType::Other(_) => NEW_LICENSE,
        ApplicationType::Renewal => BaseFees {
            application_fee: 50,
            test_fee: 0,
            license_fee: 200,
        },
        ApplicationType::Replacement => BaseFees {
            application_fee: 30,
            test_fee: 0,
            license_fee: 100,
        },
        ApplicationType::Upgrade => BaseFees {
            application_fee: 80,
            test_fee: 150,
            license_fee: 250,
        },
        ApplicationType::International => BaseFees {
            application_fee: 150,
            test_fee: 0,
            license_fee: 400,
        },
    }
}

/// Fee breakdown stored at submission time; later type corrections do not revisit it.
pub fn initial_fees(application_type: &ApplicationType) -> FeeBreakdown {
    let base = base_fees(application_type);
    FeeBreakdown::new(base.application_fee, base.test_fee, base.license_fee, 0)
}
