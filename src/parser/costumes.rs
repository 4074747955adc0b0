use crate::model::Costume;

/// `#### <name>` opens a costume; later lines are its notes, minus `Image:` captions.
pub fn parse_costumes(lines: &[String]) -> Vec<Costume> {
    let mut costumes: Vec<Costume> = Vec::new();
    for line in lines {
        if let Some(name) = line.strip_prefix("#### ") {
            costumes.push(Costume {
                name: name.trim().to_string(),
                notes: Vec::new(),
            });
        } else if let Some(current) = costumes.last_mut() {
            if !line.starts_with("Image:") && !line.is_empty() {
                current.notes.push(line.clone());
            }
        }
    }
    costumes
}
