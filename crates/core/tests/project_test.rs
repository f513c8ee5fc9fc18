use widget_injector_core::project::{
    APP_EXTENSION_PRODUCT_TYPE, NewTarget, NodeKind, ObjectId, ProjectDescriptor, ProjectGraph,
    SourceFile,
};

const FIXTURE: &str = include_str!("fixtures/HelloWorld.pbxproj");

fn inject(project: &mut ProjectDescriptor) -> ObjectId {
    let handle = project
        .add_target(&NewTarget {
            name: "HomeWidget".to_string(),
            product_type: APP_EXTENSION_PRODUCT_TYPE.to_string(),
            bundle_id: "com.example.helloworld.widget".to_string(),
            host_target: Some("HelloWorld".to_string()),
        })
        .unwrap();
    project
        .add_source_files(
            &handle.id,
            "HomeWidget",
            &[
                SourceFile::new("HomeWidget.swift"),
                SourceFile::new("Info.plist"),
            ],
        )
        .unwrap();
    handle.id
}

#[test]
fn test_injection_is_reproducible() {
    let mut first = ProjectDescriptor::parse(FIXTURE).unwrap();
    let mut second = ProjectDescriptor::parse(FIXTURE).unwrap();

    assert_eq!(inject(&mut first), inject(&mut second));
    assert_eq!(first.to_pbxproj(), second.to_pbxproj());
}

#[test]
fn test_injected_project_survives_a_write_and_reparse() {
    let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
    let target = inject(&mut project);
    let written = project.to_pbxproj();

    let reparsed = ProjectDescriptor::parse(&written).unwrap();
    assert_eq!(reparsed.to_pbxproj(), written);
    assert_eq!(reparsed.len(), project.len());
    assert_eq!(reparsed.find_target("HomeWidget"), Some(target));

    let targets: Vec<_> = reparsed
        .nodes_of_kind(NodeKind::NativeTarget)
        .filter_map(|node| node.name())
        .collect();
    assert_eq!(targets.len(), 2);
    assert!(targets.contains(&"HelloWorld"));
    assert!(targets.contains(&"HomeWidget"));
}

#[test]
fn test_written_layout_matches_xcode() {
    let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
    inject(&mut project);
    let written = project.to_pbxproj();

    assert!(written.starts_with("// !$*UTF8*$!\n{\n"));
    assert!(written.contains("/* Begin PBXCopyFilesBuildPhase section */"));
    assert!(written.contains("/* Begin PBXTargetDependency section */"));
    assert!(written.contains("productType = \"com.apple.product-type.app-extension\";"));
    assert!(written.contains("Build configuration list for PBXNativeTarget \"HomeWidget\""));

    // sections stay sorted by isa
    let sections: Vec<&str> = written
        .lines()
        .filter_map(|line| line.strip_prefix("/* Begin "))
        .filter_map(|line| line.strip_suffix(" section */"))
        .collect();
    let mut sorted = sections.clone();
    sorted.sort();
    assert_eq!(sections, sorted);
}
