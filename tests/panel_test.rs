use flex_crop::enums::MaskMode;
use flex_crop::geometry::{Matrix, Point};
use flex_crop::mask::masked_name;
use flex_crop::moments::MomentsEngine;
use flex_crop::panel::{MaskForm, RegistrationForm, selectable_volumes};
use flex_crop::region::Region;
use flex_crop::registration::RegistrationLogic;
use flex_crop::scene::{LABEL_MAP_ATTRIBUTE, Scene};
use flex_crop::volume::Volume;
use ndarray::Array3;
use proptest::prelude::*;

fn ones(n: usize) -> Volume {
    Volume::new(Array3::from_elem((n, n, n), 1.0f32), Matrix::identity())
}

#[test]
fn apply_needs_a_checked_volume() {
    let mut form = MaskForm::default();
    assert!(!form.apply_enabled());

    let mut scene = Scene::new();
    let volume = scene.add_volume("V", ones(4));
    form.volumes.push(volume);
    assert!(form.apply_enabled());

    // Without a region the button does nothing.
    assert!(form.apply(&mut scene).unwrap().is_none());
    assert_eq!(scene.len(), 1);
}

#[test]
fn apply_masks_checked_volumes() {
    let mut scene = Scene::new();
    let a = scene.add_volume("a", ones(4));
    let b = scene.add_volume("b", ones(4));
    let region = scene.add_region("R", Region::from_bounds(Point::new(0.5, 0.5, 0.5), Point::new(2.5, 2.5, 2.5)));

    let form = MaskForm {
        volumes: vec![a, b],
        region: Some(region),
        ..MaskForm::default()
    };
    assert_eq!(form.mode(), MaskMode::Clone);
    let outputs = form.apply(&mut scene).unwrap().unwrap();
    assert_eq!(outputs.len(), 2);
    let data = scene.volume(outputs[0]).unwrap().data().unwrap();
    assert_eq!(data.iter().filter(|v| **v != 0.0).count(), 8);
}

#[test]
fn in_place_checkbox_selects_in_place_mode() {
    let form = MaskForm {
        in_place: true,
        ..MaskForm::default()
    };
    assert_eq!(form.mode(), MaskMode::InPlace);
}

#[test]
fn register_needs_a_target() {
    let mut scene = Scene::new();
    let target = scene.add_volume("t", ones(4));
    let moving = scene.add_volume("m", ones(4));
    let logic = RegistrationLogic::new(MomentsEngine::new());

    let mut form = RegistrationForm {
        target: None,
        moving: vec![moving],
    };
    assert!(!form.register_enabled());
    assert!(form.register(&mut scene, &logic).unwrap().is_none());

    form.target = Some(target);
    assert!(form.register_enabled());
    let transforms = form.register(&mut scene, &logic).unwrap().unwrap();
    assert_eq!(scene.name(transforms[0]).unwrap(), "m ---TO--- t");
}

#[test]
fn label_maps_are_not_offered() {
    let mut scene = Scene::new();
    let ct = scene.add_volume("ct", ones(2));
    let labels = scene.add_volume("labels", ones(2));
    scene.set_attribute(labels, LABEL_MAP_ATTRIBUTE, "1").unwrap();
    let not_labels = scene.add_volume("explicit", ones(2));
    scene.set_attribute(not_labels, LABEL_MAP_ATTRIBUTE, "0").unwrap();

    assert_eq!(selectable_volumes(&scene), vec![ct, not_labels]);
}

proptest! {
    #[test]
    fn masked_name_is_idempotent(name in "[a-zA-Z0-9 _-]{0,24}") {
        let once = masked_name(&name);
        prop_assert!(once.contains("masked"));
        prop_assert_eq!(masked_name(&once), once.clone());
        prop_assert!(once.matches("masked").count() <= name.matches("masked").count().max(1));
    }
}
