//! The builtin release table.

use super::{Origin, ReleaseDescriptor};

const UBUNTU_COMPONENTS: &[&str] = &["main", "restricted", "universe", "multiverse"];

fn ubuntu(series: &str) -> ReleaseDescriptor {
    let mut descriptor = ReleaseDescriptor::new(&format!("ubuntu/{series}"), Origin::Static);
    descriptor.alias = Some(series.to_string());
    descriptor.components = UBUNTU_COMPONENTS.iter().map(ToString::to_string).collect();
    descriptor
}

fn esm(product: &str, series: &str, parent: &str) -> ReleaseDescriptor {
    let mut descriptor =
        ReleaseDescriptor::new(&format!("{product}/{series}"), Origin::Static);
    descriptor.alias = Some(format!("{series}/{}", product.trim_start_matches("esm-")));
    descriptor.parent = Some(parent.to_string());
    descriptor
}

/// Every release the tracker ships knowledge of. Exactly one entry carries
/// the devel flag.
pub(super) fn builtin() -> Vec<ReleaseDescriptor> {
    let mut releases = Vec::new();

    for (series, eol, oval) in [
        ("trusty", true, false),
        ("xenial", true, false),
        ("bionic", true, false),
        ("focal", false, true),
        ("jammy", false, true),
        ("noble", false, true),
        ("plucky", false, true),
    ] {
        let mut descriptor = ubuntu(series);
        descriptor.eol = eol;
        descriptor.oval = oval;
        releases.push(descriptor);
    }

    let mut devel = ubuntu("questing");
    devel.devel = true;
    devel.oval = true;
    releases.push(devel);

    for series in ["xenial", "bionic", "focal", "jammy"] {
        releases.push(esm("esm-infra", series, &format!("ubuntu/{series}")));
    }
    for series in ["xenial", "bionic", "focal", "jammy", "noble"] {
        // esm-apps derives from esm-infra where that exists, else straight
        // from the Ubuntu release.
        let parent = match series {
            "noble" => format!("ubuntu/{series}"),
            _ => format!("esm-infra/{series}"),
        };
        releases.push(esm("esm-apps", series, &parent));
    }

    releases
}
