//! Restrict a field to an area.

use std::any::Any;
use std::fmt;

use tracing::debug;

use regrid_core::repres::BoundingBox;
use regrid_plan::{Action, ActionError, Context};

/// Crop the field to a bounding box.
///
/// Delegates the index arithmetic to the field's representation; a
/// representation kind that cannot be cropped, or an area containing no
/// grid points, fails the action.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaCrop {
    area: BoundingBox,
}

impl AreaCrop {
    /// Crop to `area`.
    pub fn new(area: BoundingBox) -> Self {
        Self { area }
    }

    /// The target area.
    pub fn area(&self) -> &BoundingBox {
        &self.area
    }
}

impl fmt::Display for AreaCrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crop[area={}]", self.area)
    }
}

impl Action for AreaCrop {
    fn name(&self) -> &str {
        "crop"
    }

    fn execute(&self, context: &mut Context) -> Result<(), ActionError> {
        let field = context.field_mut()?;
        let (cropped, mapping) =
            field
                .representation()
                .crop(&self.area)
                .ok_or_else(|| ActionError::Failed {
                    action: "crop".to_string(),
                    detail: format!(
                        "cannot crop {} to {}",
                        field.representation().unique_id(),
                        self.area
                    ),
                })?;
        debug!(
            from = field.representation().point_count(),
            to = cropped.point_count(),
            area = %self.area,
            "cropping field"
        );
        let values = mapping.iter().map(|&i| field.values()[i]).collect();
        field.replace(cropped, values)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }

    /// Two successive crops collapse to one crop to their intersection.
    fn merge_with_next(&self, next: &dyn Action) -> Option<Box<dyn Action>> {
        let next = next.as_any().downcast_ref::<Self>()?;
        let merged = self.area.intersection(&next.area)?;
        Some(Box::new(AreaCrop::new(merged)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrid_core::param::ParamMap;
    use regrid_core::stats::Statistics;
    use regrid_plan::ActionPlan;
    use regrid_test_utils::fixtures;
    use std::sync::{Arc, Mutex};

    #[test]
    fn crops_values_with_the_representation() {
        // 5x5 global grid, 90/90 spacing in longitude, 45 in latitude.
        let field = fixtures::latlon_field(5, 5);
        let stats = Arc::new(Mutex::new(Statistics::new()));
        let mut context = Context::with_field(field, stats);

        let crop = AreaCrop::new(BoundingBox::new(45.0, 90.0, -45.0, 270.0).unwrap());
        crop.execute(&mut context).unwrap();

        let field = context.field().unwrap();
        assert_eq!(field.representation().point_count(), 9);
        // Rows 1..=3, columns 1..=3 of the 5x5 ramp.
        assert_eq!(
            field.values(),
            &[6.0, 7.0, 8.0, 11.0, 12.0, 13.0, 16.0, 17.0, 18.0]
        );
    }

    #[test]
    fn uncroppable_representation_fails() {
        let field = fixtures::spectral_field(5);
        let stats = Arc::new(Mutex::new(Statistics::new()));
        let mut context = Context::with_field(field, stats);

        let crop = AreaCrop::new(BoundingBox::new(45.0, 90.0, -45.0, 270.0).unwrap());
        assert!(matches!(
            crop.execute(&mut context),
            Err(ActionError::Failed { .. })
        ));
    }

    #[test]
    fn adjacent_crops_compress_to_the_intersection() {
        let mut plan = ActionPlan::new(Arc::new(ParamMap::new()));
        plan.add_action(Box::new(AreaCrop::new(
            BoundingBox::new(60.0, 0.0, 0.0, 60.0).unwrap(),
        )));
        plan.add_action(Box::new(AreaCrop::new(
            BoundingBox::new(30.0, 30.0, -30.0, 90.0).unwrap(),
        )));
        plan.compress();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.action(0).unwrap().to_string(), "Crop[area=30/30/0/60]");
    }

    #[test]
    fn disjoint_crops_do_not_merge() {
        let a = AreaCrop::new(BoundingBox::new(60.0, 0.0, 40.0, 60.0).unwrap());
        let b = AreaCrop::new(BoundingBox::new(-40.0, 100.0, -60.0, 120.0).unwrap());
        assert!(a.merge_with_next(&b).is_none());
    }
}
